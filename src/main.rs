mod app;
mod dispatch;
mod input;
mod lookup;
mod ui;

use std::env;
use std::path::Path;

use color_eyre::eyre::{bail, WrapErr};

use clap::{Parser, Subcommand};

use dispatch::storage::{self, find_despacho_dir, init_dir, FilePort};
use dispatch::store::RequestStore;
use dispatch::wait::{format_wait, wait_minutes};
use dispatch::{Priority, RequestDraft, Status};

#[derive(Parser)]
#[command(name = "despacho", about = "Quadro de despacho de ambulâncias no terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Cria um diretório .despacho/ com o quadro padrão
    Init,
    /// Registra um novo chamado direto da linha de comando
    Add {
        /// Nome do paciente
        patient: String,
        /// Telefone de contato
        #[arg(short = 't', long)]
        phone: String,
        /// Endereço de origem
        #[arg(short, long)]
        origin: String,
        /// Destino (hospital, clínica)
        #[arg(short, long)]
        destination: String,
        /// Prioridade (low, medium, high, urgent)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Observações
        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Lista os chamados agrupados por coluna
    List {
        /// Filtra por status (triage, allocated, en_route, completed, cancelled)
        #[arg(short, long)]
        status: Option<Status>,
        /// Filtra por prioridade
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Cancela um chamado pelo id
    Cancel {
        /// Id do chamado
        id: i64,
    },
    /// Marca um chamado como urgente
    Urgent {
        /// Id do chamado
        id: i64,
    },
    /// Envia o log de atividades para stdout (JSONL, um evento por linha)
    Log,
}

fn main() {
    // Install color_eyre for unexpected panics/errors (developer bugs).
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let cwd = match env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: cannot determine current directory: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Command::Init) => cmd_init(&cwd),
        Some(Command::Add {
            patient,
            phone,
            origin,
            destination,
            priority,
            notes,
        }) => cmd_add(&cwd, patient, phone, origin, destination, priority, notes),
        Some(Command::List { status, priority }) => cmd_list(&cwd, status, priority),
        Some(Command::Cancel { id }) => cmd_cancel(&cwd, id),
        Some(Command::Urgent { id }) => cmd_urgent(&cwd, id),
        Some(Command::Log) => cmd_log(&cwd),
        None => cmd_tui(&cwd),
    };

    if let Err(e) = result {
        print_user_error(&e);
        std::process::exit(1);
    }
}

/// Print a user-friendly error message, with actionable hints for known error types.
fn print_user_error(error: &color_eyre::Report) {
    // Walk the error chain looking for known types.
    if let Some(storage_err) = error.downcast_ref::<storage::StorageError>() {
        match storage_err {
            storage::StorageError::NotFound(_) => {
                eprintln!("erro: nenhum quadro de despacho encontrado neste diretório.");
                eprintln!("  Execute `despacho init` para criar um.");
            }
            storage::StorageError::Json(e) => {
                eprintln!("erro: o arquivo de chamados está corrompido.");
                eprintln!("  {e}");
                eprintln!("  Verifique .despacho/chamados.json ou remova-o para recomeçar.");
            }
            storage::StorageError::TomlDe(e) => {
                eprintln!("erro: arquivo de configuração com TOML inválido.");
                eprintln!("  {e}");
            }
            storage::StorageError::TomlSer(e) => {
                eprintln!("erro: falha ao gravar a configuração do quadro.");
                eprintln!("  {e}");
            }
            storage::StorageError::Io(e) => {
                eprintln!("erro: não foi possível ler ou gravar os arquivos do quadro.");
                eprintln!("  {e}");
            }
        }
        return;
    }

    // For eyre::eyre!() / bail!() messages, print the full error chain.
    // These are already human-readable strings like "Chamado 42 não encontrado".
    eprintln!("erro: {e:#}", e = error);
}

fn cmd_init(cwd: &Path) -> color_eyre::Result<()> {
    if cwd.join(".despacho").exists() {
        bail!("Já existe um quadro neste diretório.");
    }

    let despacho_dir = init_dir(cwd)?;
    println!("Quadro de despacho criado em {}", despacho_dir.display());
    println!("\nColunas: Triagem, Alocado, Em Deslocamento, Concluído, Cancelado");
    println!("Execute `despacho` para abrir o quadro.");
    Ok(())
}

fn open_store(despacho_dir: &Path) -> RequestStore {
    RequestStore::open(
        Box::new(FilePort::new(despacho_dir.to_path_buf())),
        chrono::Utc::now(),
    )
}

#[allow(clippy::too_many_arguments)]
fn cmd_add(
    cwd: &Path,
    patient: String,
    phone: String,
    origin: String,
    destination: String,
    priority: Priority,
    notes: String,
) -> color_eyre::Result<()> {
    let despacho_dir = find_despacho_dir(cwd)?;
    let mut store = open_store(&despacho_dir);

    if patient.trim().is_empty() {
        bail!("O nome do paciente não pode ficar vazio.");
    }

    let draft = RequestDraft {
        patient: patient.trim().to_string(),
        phone: phone.trim().to_string(),
        origin: origin.trim().to_string(),
        destination: destination.trim().to_string(),
        priority,
        notes: notes.trim().to_string(),
    };
    let created = store.create(draft, chrono::Utc::now())?;
    storage::append_activity(
        &despacho_dir,
        "create",
        created.id,
        &created.patient,
        &[("priority", created.priority.as_str())],
    );
    println!("Chamado {} criado: {}", created.id, created.patient);
    Ok(())
}

fn cmd_list(
    cwd: &Path,
    status: Option<Status>,
    priority: Option<Priority>,
) -> color_eyre::Result<()> {
    let despacho_dir = find_despacho_dir(cwd)?;
    let store = open_store(&despacho_dir);
    let layout = storage::load_layout(&despacho_dir);
    let now = chrono::Utc::now();

    for column in layout.columns() {
        let Some(col_status) = column.id.status() else {
            // Custom columns are visual buckets; requests live in statuses.
            continue;
        };
        if let Some(filter) = status {
            if col_status != filter {
                continue;
            }
        }

        let requests: Vec<_> = store
            .requests()
            .iter()
            .filter(|r| r.status == col_status)
            .filter(|r| priority.map_or(true, |p| r.priority == p))
            .collect();

        if requests.is_empty() && status.is_none() {
            continue;
        }

        println!("\n{} ({})", column.name, requests.len());
        println!("{}", "─".repeat(40));
        for request in &requests {
            let wait = format_wait(wait_minutes(request.created_at, now));
            println!(
                "  {} {:>8}  {} [{}]  → {}",
                request.id,
                wait,
                request.patient,
                request.priority.label(),
                request.destination,
            );
        }
    }
    println!();
    Ok(())
}

fn cmd_cancel(cwd: &Path, id: i64) -> color_eyre::Result<()> {
    let despacho_dir = find_despacho_dir(cwd)?;
    let mut store = open_store(&despacho_dir);

    let patient = match store.get(id) {
        Some(request) => request.patient.clone(),
        None => bail!("Chamado {} não encontrado", id),
    };
    store.cancel(id)?;
    storage::append_activity(&despacho_dir, "cancel", id, &patient, &[]);
    println!("Chamado {id} ({patient}) cancelado.");
    Ok(())
}

fn cmd_urgent(cwd: &Path, id: i64) -> color_eyre::Result<()> {
    let despacho_dir = find_despacho_dir(cwd)?;
    let mut store = open_store(&despacho_dir);

    let patient = match store.get(id) {
        Some(request) => request.patient.clone(),
        None => bail!("Chamado {} não encontrado", id),
    };
    store.mark_urgent(id)?;
    storage::append_activity(
        &despacho_dir,
        "urgent",
        id,
        &patient,
        &[("priority", Priority::Urgent.as_str())],
    );
    println!("Chamado {id} ({patient}) marcado como urgente.");
    Ok(())
}

fn cmd_log(cwd: &Path) -> color_eyre::Result<()> {
    use std::io::{self, BufRead, BufWriter, ErrorKind, Write};

    let despacho_dir = find_despacho_dir(cwd)?;
    let log_path = despacho_dir.join("activity.log");

    let file = match std::fs::File::open(&log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).wrap_err("failed to open activity.log"),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in io::BufReader::new(file).lines() {
        let line = line.wrap_err("error reading activity.log")?;
        match writeln!(out, "{line}") {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(()),
            Err(e) => return Err(e).wrap_err("error writing to stdout"),
        }
    }
    // Flush explicitly, BufWriter silently drops flush errors on drop.
    // Treat BrokenPipe as a clean exit (consumer closed the pipe).
    if let Err(e) = out.flush() {
        if e.kind() != ErrorKind::BrokenPipe {
            return Err(e).wrap_err("error flushing stdout");
        }
    }
    Ok(())
}

fn cmd_tui(cwd: &Path) -> color_eyre::Result<()> {
    let mut terminal = ratatui::init();
    let result = app::run(&mut terminal, cwd);
    ratatui::restore();
    result
}
