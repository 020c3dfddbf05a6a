use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::layout::{Column, Layout};
use super::store::RequestPort;
use super::CallRequest;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error(".despacho directory not found (walked up from {0})")]
    NotFound(PathBuf),
}

/// Find the .despacho directory by walking up from `start`.
pub fn find_despacho_dir(start: &Path) -> Result<PathBuf, StorageError> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(".despacho");
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !dir.pop() {
            return Err(StorageError::NotFound(start.to_path_buf()));
        }
    }
}

/// Initialize a new .despacho directory with the default column layout.
/// The request collection file is only created on first save, so a fresh
/// board starts from the demonstration seed.
pub fn init_dir(root: &Path) -> Result<PathBuf, StorageError> {
    let despacho_dir = root.join(".despacho");
    fs::create_dir_all(&despacho_dir)?;
    save_layout(&despacho_dir, &Layout::default())?;
    Ok(despacho_dir)
}

// ---------------------------------------------------------------------------
// Request collection (.despacho/chamados.json)
// ---------------------------------------------------------------------------

fn requests_path(despacho_dir: &Path) -> PathBuf {
    despacho_dir.join("chamados.json")
}

/// Load the request collection. `Ok(None)` when nothing has been saved yet.
pub fn load_requests(despacho_dir: &Path) -> Result<Option<Vec<CallRequest>>, StorageError> {
    let path = requests_path(despacho_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn save_requests(despacho_dir: &Path, requests: &[CallRequest]) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(requests)?;
    fs::write(requests_path(despacho_dir), content)?;
    Ok(())
}

/// Production persistence port backed by the .despacho directory.
pub struct FilePort {
    despacho_dir: PathBuf,
}

impl FilePort {
    pub fn new(despacho_dir: PathBuf) -> Self {
        Self { despacho_dir }
    }
}

impl RequestPort for FilePort {
    fn load(&self) -> Result<Option<Vec<CallRequest>>, StorageError> {
        load_requests(&self.despacho_dir)
    }

    fn save(&self, requests: &[CallRequest]) -> Result<(), StorageError> {
        save_requests(&self.despacho_dir, requests)
    }
}

// ---------------------------------------------------------------------------
// Column layout (.despacho/columns.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct ColumnsFile {
    #[serde(default)]
    columns: Vec<Column>,
}

fn columns_path(despacho_dir: &Path) -> PathBuf {
    despacho_dir.join("columns.toml")
}

/// Load the column layout, normalizing whatever was persisted. A missing
/// or unreadable file yields the default layout with a stderr warning for
/// the unreadable case.
pub fn load_layout(despacho_dir: &Path) -> Layout {
    let path = columns_path(despacho_dir);
    if !path.exists() {
        return Layout::default();
    }
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<ColumnsFile>(&content) {
            Ok(file) => Layout::from_columns(file.columns),
            Err(err) => {
                eprintln!("warning: could not parse {}: {err}", path.display());
                Layout::default()
            }
        },
        Err(err) => {
            eprintln!("warning: could not read {}: {err}", path.display());
            Layout::default()
        }
    }
}

pub fn save_layout(despacho_dir: &Path, layout: &Layout) -> Result<(), StorageError> {
    let file = ColumnsFile {
        columns: layout.columns().to_vec(),
    };
    let content = toml::to_string_pretty(&file)?;
    fs::write(columns_path(despacho_dir), content)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Session (.despacho/session.toml)
// ---------------------------------------------------------------------------

/// Operator session flag. Any non-empty operator name counts as logged in;
/// this is a convenience gate, not authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub operator: String,
    #[serde(default)]
    pub authenticated: bool,
}

fn session_path(despacho_dir: &Path) -> PathBuf {
    despacho_dir.join("session.toml")
}

/// Load the session. Missing or corrupt files mean "not logged in".
pub fn load_session(despacho_dir: &Path) -> Option<Session> {
    let content = fs::read_to_string(session_path(despacho_dir)).ok()?;
    let session: Session = toml::from_str(&content).ok()?;
    if session.authenticated && !session.operator.is_empty() {
        Some(session)
    } else {
        None
    }
}

pub fn save_session(despacho_dir: &Path, session: &Session) -> Result<(), StorageError> {
    let content = toml::to_string_pretty(session)?;
    fs::write(session_path(despacho_dir), content)?;
    Ok(())
}

pub fn clear_session(despacho_dir: &Path) {
    let _ = fs::remove_file(session_path(despacho_dir));
}

// ---------------------------------------------------------------------------
// Activity log (.despacho/activity.log — append-only JSONL)
// ---------------------------------------------------------------------------

/// Escape a string as a JSON-encoded string value (including surrounding
/// quotes). ASCII control characters are written as `\uXXXX`; everything
/// else, including non-ASCII Unicode, is raw UTF-8, which is valid JSON.
fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Append a single JSONL event to `.despacho/activity.log`.
///
/// The common fields are `ts`, `action`, `id`, and `patient`. `extras` is a
/// slice of `(key, value)` pairs appended after them. The write is
/// best-effort: any I/O error is silently discarded so a log failure never
/// interrupts normal operations.
pub fn append_activity(
    despacho_dir: &Path,
    action: &str,
    request_id: i64,
    patient: &str,
    extras: &[(&str, &str)],
) {
    let _ = try_append_activity(despacho_dir, action, request_id, patient, extras);
}

fn try_append_activity(
    despacho_dir: &Path,
    action: &str,
    request_id: i64,
    patient: &str,
    extras: &[(&str, &str)],
) -> std::io::Result<()> {
    use std::io::Write;
    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut line = format!(
        "{{\"ts\":{},\"action\":{},\"id\":{request_id},\"patient\":{}",
        json_escape(&ts),
        json_escape(action),
        json_escape(patient),
    );
    for (k, v) in extras {
        line.push(',');
        line.push_str(&json_escape(k));
        line.push(':');
        line.push_str(&json_escape(v));
    }
    line.push('}');

    let path = despacho_dir.join("activity.log");
    let mut file = fs::OpenOptions::new().append(true).create(true).open(&path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Read the activity log as raw lines, oldest first. Missing file is empty.
pub fn read_activity(despacho_dir: &Path) -> Result<Vec<String>, StorageError> {
    let path = despacho_dir.join("activity.log");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)?;
    Ok(content.lines().map(str::to_string).collect())
}
