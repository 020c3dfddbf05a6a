use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;

use crate::dispatch::filter::{matches_kanban, Filters};
use crate::dispatch::layout::{ColumnId, Layout};
use crate::dispatch::storage::{
    append_activity, clear_session, find_despacho_dir, load_layout, load_session, save_layout,
    save_session, FilePort, Session, StorageError,
};
use crate::dispatch::store::RequestStore;
use crate::dispatch::wait::WaitBucket;
use crate::dispatch::{CallRequest, Priority, RequestDraft, RequestPatch, Status};
use crate::input::action::Action;
use crate::input::keymap::map_key;
use crate::lookup;

/// Reusable text editing buffer with cursor.
///
/// `cursor` is a **char index** (not byte index), always in `0..=char_count`.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    pub input: String,
    pub cursor: usize,
}

impl TextBuffer {
    pub fn new(input: String) -> Self {
        let cursor = input.chars().count();
        Self { input, cursor }
    }

    pub fn empty() -> Self {
        Self { input: String::new(), cursor: 0 }
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert(&mut self, c: char) {
        let byte_idx = self.byte_offset(self.cursor);
        self.input.insert(byte_idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let byte_idx = self.byte_offset(self.cursor - 1);
            self.input.remove(byte_idx);
            self.cursor -= 1;
        }
    }

    pub fn delete_word(&mut self) {
        let byte_pos = self.byte_offset(self.cursor);
        let before = &self.input[..byte_pos];
        let trimmed = before.trim_end();
        let start_byte = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let start_char = self.input[..start_byte].chars().count();
        self.input.drain(start_byte..byte_pos);
        self.cursor = start_char;
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

/// The two interchangeable views over the same collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Kanban,
    Lista,
}

impl View {
    pub fn toggle(self) -> Self {
        match self {
            Self::Kanban => Self::Lista,
            Self::Lista => Self::Kanban,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Kanban => "Kanban",
            Self::Lista => "Lista",
        }
    }
}

/// Fields of the request form, in Tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Patient,
    Phone,
    Origin,
    CepOrigin,
    Destination,
    CepDestination,
    Priority,
    Notes,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        Self::Patient,
        Self::Phone,
        Self::Origin,
        Self::CepOrigin,
        Self::Destination,
        Self::CepDestination,
        Self::Priority,
        Self::Notes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Patient => "Paciente",
            Self::Phone => "Telefone",
            Self::Origin => "Endereço de origem",
            Self::CepOrigin => "CEP origem (Ctrl-B busca)",
            Self::Destination => "Destino",
            Self::CepDestination => "CEP destino (Ctrl-B busca)",
            Self::Priority => "Prioridade",
            Self::Notes => "Observações",
        }
    }
}

/// Create/edit form state. The CEP boxes are auxiliary inputs that fill
/// the adjacent address field via the postal-code lookup.
#[derive(Debug, Clone)]
pub struct RequestForm {
    pub editing: Option<i64>,
    pub patient: TextBuffer,
    pub phone: TextBuffer,
    pub origin: TextBuffer,
    pub cep_origin: TextBuffer,
    pub destination: TextBuffer,
    pub cep_destination: TextBuffer,
    pub notes: TextBuffer,
    pub priority: Priority,
    pub focus: FormField,
    pub errors: Vec<(FormField, &'static str)>,
}

impl RequestForm {
    pub fn new(request: Option<&CallRequest>) -> Self {
        match request {
            Some(r) => Self {
                editing: Some(r.id),
                patient: TextBuffer::new(r.patient.clone()),
                phone: TextBuffer::new(r.phone.clone()),
                origin: TextBuffer::new(r.origin.clone()),
                cep_origin: TextBuffer::empty(),
                destination: TextBuffer::new(r.destination.clone()),
                cep_destination: TextBuffer::empty(),
                notes: TextBuffer::new(r.notes.clone()),
                priority: r.priority,
                focus: FormField::Patient,
                errors: Vec::new(),
            },
            None => Self {
                editing: None,
                patient: TextBuffer::empty(),
                phone: TextBuffer::empty(),
                origin: TextBuffer::empty(),
                cep_origin: TextBuffer::empty(),
                destination: TextBuffer::empty(),
                cep_destination: TextBuffer::empty(),
                notes: TextBuffer::empty(),
                priority: Priority::default(),
                focus: FormField::Patient,
                errors: Vec::new(),
            },
        }
    }

    pub fn buffer(&self, field: FormField) -> Option<&TextBuffer> {
        match field {
            FormField::Patient => Some(&self.patient),
            FormField::Phone => Some(&self.phone),
            FormField::Origin => Some(&self.origin),
            FormField::CepOrigin => Some(&self.cep_origin),
            FormField::Destination => Some(&self.destination),
            FormField::CepDestination => Some(&self.cep_destination),
            FormField::Notes => Some(&self.notes),
            FormField::Priority => None,
        }
    }

    pub fn focused_buffer(&mut self) -> Option<&mut TextBuffer> {
        match self.focus {
            FormField::Patient => Some(&mut self.patient),
            FormField::Phone => Some(&mut self.phone),
            FormField::Origin => Some(&mut self.origin),
            FormField::CepOrigin => Some(&mut self.cep_origin),
            FormField::Destination => Some(&mut self.destination),
            FormField::CepDestination => Some(&mut self.cep_destination),
            FormField::Notes => Some(&mut self.notes),
            FormField::Priority => None,
        }
    }

    pub fn next_field(&mut self) {
        let idx = FormField::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = FormField::ALL[(idx + 1) % FormField::ALL.len()];
    }

    pub fn prev_field(&mut self) {
        let idx = FormField::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = FormField::ALL[(idx + FormField::ALL.len() - 1) % FormField::ALL.len()];
    }

    pub fn error_for(&self, field: FormField) -> Option<&'static str> {
        self.errors.iter().find(|(f, _)| *f == field).map(|(_, m)| *m)
    }

    /// Required-field validation. Populates `errors`; returns whether the
    /// form can be submitted.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        if self.patient.input.trim().is_empty() {
            self.errors.push((FormField::Patient, "Nome do paciente é obrigatório"));
        }
        if self.phone.input.trim().is_empty() {
            self.errors.push((FormField::Phone, "Telefone é obrigatório"));
        }
        if self.origin.input.trim().is_empty() {
            self.errors.push((FormField::Origin, "Endereço de origem é obrigatório"));
        }
        if self.destination.input.trim().is_empty() {
            self.errors.push((FormField::Destination, "Destino é obrigatório"));
        }
        self.errors.is_empty()
    }

    pub fn draft(&self) -> RequestDraft {
        RequestDraft {
            patient: self.patient.input.trim().to_string(),
            phone: self.phone.input.trim().to_string(),
            origin: self.origin.input.trim().to_string(),
            destination: self.destination.input.trim().to_string(),
            priority: self.priority,
            notes: self.notes.input.trim().to_string(),
        }
    }

    pub fn patch(&self) -> RequestPatch {
        RequestPatch {
            patient: Some(self.patient.input.trim().to_string()),
            phone: Some(self.phone.input.trim().to_string()),
            origin: Some(self.origin.input.trim().to_string()),
            destination: Some(self.destination.input.trim().to_string()),
            notes: Some(self.notes.input.trim().to_string()),
            priority: Some(self.priority),
            status: None,
        }
    }
}

/// Current interaction mode.
#[derive(Debug, Clone)]
pub enum Mode {
    Login {
        buf: TextBuffer,
    },
    Normal,
    Column,
    Filter {
        buf: TextBuffer,
    },
    Form {
        form: RequestForm,
    },
    Input {
        prompt: String,
        buf: TextBuffer,
        target: InputTarget,
    },
    Confirm {
        prompt: String,
        target: ConfirmTarget,
    },
    Picker {
        title: String,
        items: Vec<String>,
        selected: usize,
        target: PickerTarget,
    },
    Links {
        request_id: i64,
    },
    Notice {
        message: String,
        back: Option<Box<Mode>>,
    },
    Help,
}

#[derive(Debug, Clone)]
pub enum InputTarget {
    AddColumn,
    RenameColumn(ColumnId),
}

#[derive(Debug, Clone)]
pub enum ConfirmTarget {
    CancelRequest(i64),
    DeleteColumn(ColumnId),
}

#[derive(Debug, Clone)]
pub enum PickerTarget {
    StatusFilter,
    PriorityFilter,
    WaitFilter,
    MoveToColumn(i64),
    ColumnColor(ColumnId),
}

/// Notification severity for statusbar coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Global application state.
pub struct AppState {
    pub mode: Mode,
    pub view: View,
    pub filters: Filters,
    pub focused_column: usize,
    pub selected_card: usize,
    /// Wall-clock input for wait display and filters, refreshed by the
    /// minute tick in the event loop.
    pub clock: DateTime<Utc>,
    pub operator: String,
    pub notification: Option<String>,
    pub notification_level: NotificationLevel,
    pub notification_expires: Option<Instant>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(clock: DateTime<Utc>) -> Self {
        Self {
            mode: Mode::Normal,
            view: View::Kanban,
            filters: Filters::default(),
            focused_column: 0,
            selected_card: 0,
            clock,
            operator: String::new(),
            notification: None,
            notification_level: NotificationLevel::Info,
            notification_expires: None,
            should_quit: false,
        }
    }

    /// Show a transient notification.
    pub fn notify(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Info;
        self.notification_expires = Some(Instant::now() + Duration::from_secs(3));
    }

    /// Show a transient error notification (rendered in red).
    pub fn notify_error(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_level = NotificationLevel::Error;
        self.notification_expires = Some(Instant::now() + Duration::from_secs(3));
    }

    /// Clear expired notifications.
    pub fn tick_notification(&mut self) {
        if let Some(expires) = self.notification_expires {
            if Instant::now() >= expires {
                self.notification = None;
                self.notification_level = NotificationLevel::Info;
                self.notification_expires = None;
            }
        }
    }

    /// Open a blocking notice modal, stashing the current mode so the
    /// user returns to it on dismissal.
    pub fn open_notice(&mut self, message: impl Into<String>) {
        let back = std::mem::replace(&mut self.mode, Mode::Normal);
        self.mode = Mode::Notice {
            message: message.into(),
            back: Some(Box::new(back)),
        };
    }
}

/// Indices of the layout columns shown in the Kanban view. The status
/// filter narrows which columns appear; other filters only thin the cards.
pub fn visible_columns(layout: &Layout, filters: &Filters) -> Vec<usize> {
    layout
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, col)| match filters.status {
            Some(status) => col.id == ColumnId::Fixed(status),
            None => true,
        })
        .map(|(i, _)| i)
        .collect()
}

/// Requests shown in one Kanban column, in collection order. Custom
/// columns never hold requests.
pub fn column_requests<'a>(
    store: &'a RequestStore,
    layout: &Layout,
    column_index: usize,
    filters: &Filters,
) -> Vec<&'a CallRequest> {
    let Some(status) = layout.get(column_index).and_then(|c| c.id.status()) else {
        return Vec::new();
    };
    store
        .requests()
        .iter()
        .filter(|r| r.status == status && matches_kanban(r, filters))
        .collect()
}

/// Requests shown in the list view.
pub fn list_requests<'a>(store: &'a RequestStore, state: &AppState) -> Vec<&'a CallRequest> {
    crate::dispatch::filter::apply(store.requests(), &state.filters, state.clock)
}

/// Id of the request under the cursor, in either view.
pub fn selected_request_id(
    store: &RequestStore,
    layout: &Layout,
    state: &AppState,
) -> Option<i64> {
    match state.view {
        View::Kanban => {
            let visible = visible_columns(layout, &state.filters);
            let col = *visible.get(state.focused_column)?;
            column_requests(store, layout, col, &state.filters)
                .get(state.selected_card)
                .map(|r| r.id)
        }
        View::Lista => list_requests(store, state).get(state.selected_card).map(|r| r.id),
    }
}

/// Clamp focus and selection to what is currently visible.
pub fn clamp_selection(store: &RequestStore, layout: &Layout, state: &mut AppState) {
    match state.view {
        View::Kanban => {
            let visible = visible_columns(layout, &state.filters);
            if visible.is_empty() {
                state.focused_column = 0;
                state.selected_card = 0;
                return;
            }
            if state.focused_column >= visible.len() {
                state.focused_column = visible.len() - 1;
            }
            let cards = column_requests(
                store,
                layout,
                visible[state.focused_column],
                &state.filters,
            );
            if cards.is_empty() {
                state.selected_card = 0;
            } else if state.selected_card >= cards.len() {
                state.selected_card = cards.len() - 1;
            }
        }
        View::Lista => {
            let rows = list_requests(store, state).len();
            if rows == 0 {
                state.selected_card = 0;
            } else if state.selected_card >= rows {
                state.selected_card = rows - 1;
            }
        }
    }
}

/// Sync the live search text from the filter buffer.
fn sync_search(state: &mut AppState) {
    if let Mode::Filter { buf } = &state.mode {
        state.filters.search = buf.input.clone();
    }
}

const WILDCARD: &str = "Todos";

fn report<T>(state: &mut AppState, result: Result<T, StorageError>) {
    if let Err(err) = result {
        state.notify_error(format!("Falha ao gravar: {err}"));
    }
}

/// Main TUI application loop.
pub fn run(terminal: &mut DefaultTerminal, start_dir: &std::path::Path) -> color_eyre::Result<()> {
    let despacho_dir = find_despacho_dir(start_dir)?;
    let mut store = RequestStore::open(Box::new(FilePort::new(despacho_dir.clone())), Utc::now());
    let mut layout = load_layout(&despacho_dir);
    let mut state = AppState::new(Utc::now());

    match load_session(&despacho_dir) {
        Some(session) => state.operator = session.operator,
        None => state.mode = Mode::Login { buf: TextBuffer::empty() },
    }

    clamp_selection(&store, &layout, &mut state);

    let mut last_clock = Instant::now();
    let clock_interval = Duration::from_secs(60);

    loop {
        state.tick_notification();

        // Minute tick: refresh the wall-clock input so wait times advance
        // without user interaction.
        if last_clock.elapsed() >= clock_interval {
            state.clock = Utc::now();
            clamp_selection(&store, &layout, &mut state);
            last_clock = Instant::now();
        }

        terminal.draw(|f| crate::ui::render(f, &store, &layout, &state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                let action = map_key(key, &state.mode);
                process_action(&mut store, &mut layout, &mut state, action, &despacho_dir)?;

                if state.should_quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

pub fn process_action(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) -> color_eyre::Result<()> {
    match action {
        Action::None => {}

        // Navigation
        Action::FocusPrevColumn
        | Action::FocusNextColumn
        | Action::SelectPrevCard
        | Action::SelectNextCard => {
            handle_navigation(store, layout, state, action);
        }

        // Card movement and request actions
        Action::MoveCardPrevColumn
        | Action::MoveCardNextColumn
        | Action::MoveToColumn
        | Action::NewRequest
        | Action::EditRequest
        | Action::MarkUrgent
        | Action::CancelRequest
        | Action::ShowLinks => {
            handle_request_action(store, layout, state, action, despacho_dir);
        }

        // Column management
        Action::ColAdd
        | Action::ColRename
        | Action::ColDelete
        | Action::ColPickColor
        | Action::ColMoveLeft
        | Action::ColMoveRight => {
            handle_column_action(store, layout, state, action, despacho_dir);
        }

        // Text input delegation
        Action::InputChar(_)
        | Action::InputBackspace
        | Action::InputLeft
        | Action::InputRight
        | Action::InputHome
        | Action::InputEnd
        | Action::InputDeleteWord
        | Action::InputConfirm
        | Action::InputCancel => {
            handle_input(store, layout, state, action, despacho_dir);
        }

        // Request form
        Action::FormNextField
        | Action::FormPrevField
        | Action::FormSubmit
        | Action::FormLookupCep => {
            handle_form(store, state, action, despacho_dir);
        }

        // Confirmation
        Action::Confirm | Action::Deny => {
            handle_confirm(store, layout, state, action, despacho_dir);
        }

        // Views and filters
        Action::ToggleView => {
            state.view = state.view.toggle();
            state.focused_column = 0;
            state.selected_card = 0;
            clamp_selection(store, layout, state);
        }
        Action::StartSearch => {
            state.mode = Mode::Filter {
                buf: TextBuffer::new(state.filters.search.clone()),
            };
        }
        Action::PickStatusFilter | Action::PickPriorityFilter | Action::PickWaitFilter => {
            open_filter_picker(state, action);
        }
        Action::ClearFilters => {
            if state.filters.is_active() {
                state.filters.clear();
                clamp_selection(store, layout, state);
                state.notify("Filtros limpos");
            }
        }

        // Mode entry and session
        Action::EnterColumnMode => {
            if state.view == View::Kanban {
                state.mode = Mode::Column;
            } else {
                state.notify("Colunas são editadas na visão Kanban");
            }
        }
        Action::Logout => {
            clear_session(despacho_dir);
            state.operator.clear();
            state.filters.clear();
            state.mode = Mode::Login { buf: TextBuffer::empty() };
        }
        Action::ShowHelp => state.mode = Mode::Help,
        Action::ClosePanel => state.mode = Mode::Normal,
        Action::DismissNotice => {
            if let Mode::Notice { back, .. } = &mut state.mode {
                state.mode = match back.take() {
                    Some(back) => *back,
                    None => Mode::Normal,
                };
            }
        }
        Action::Quit => match &state.mode {
            Mode::Normal => state.should_quit = true,
            _ => state.mode = Mode::Normal,
        },
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Navigation (column focus, card selection, picker rows)
// ---------------------------------------------------------------------------

fn handle_navigation(store: &RequestStore, layout: &Layout, state: &mut AppState, action: Action) {
    match action {
        Action::FocusPrevColumn => {
            if state.view == View::Kanban && state.focused_column > 0 {
                state.focused_column -= 1;
                clamp_selection(store, layout, state);
            }
        }
        Action::FocusNextColumn => {
            if state.view == View::Kanban {
                let visible = visible_columns(layout, &state.filters);
                if state.focused_column + 1 < visible.len() {
                    state.focused_column += 1;
                    clamp_selection(store, layout, state);
                }
            }
        }
        Action::SelectPrevCard => match &mut state.mode {
            Mode::Picker { selected, .. } => {
                if *selected > 0 {
                    *selected -= 1;
                }
            }
            _ => {
                if state.selected_card > 0 {
                    state.selected_card -= 1;
                }
            }
        },
        Action::SelectNextCard => match &mut state.mode {
            Mode::Picker { selected, items, .. } => {
                if *selected + 1 < items.len() {
                    *selected += 1;
                }
            }
            _ => {
                let rows = match state.view {
                    View::Kanban => {
                        let visible = visible_columns(layout, &state.filters);
                        visible
                            .get(state.focused_column)
                            .map(|&col| column_requests(store, layout, col, &state.filters).len())
                            .unwrap_or(0)
                    }
                    View::Lista => list_requests(store, state).len(),
                };
                if state.selected_card + 1 < rows {
                    state.selected_card += 1;
                }
            }
        },
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Request actions (create, edit, status moves, links)
// ---------------------------------------------------------------------------

/// Move the selected card onto the column at visible offset `to`. Fixed
/// columns update the status (Cancelled asks first); custom columns are
/// visual-only buckets, so the status is left alone.
fn drop_card_on_column(
    store: &mut RequestStore,
    layout: &Layout,
    state: &mut AppState,
    request_id: i64,
    to: usize,
    despacho_dir: &std::path::Path,
) {
    let visible = visible_columns(layout, &state.filters);
    let Some(&col_idx) = visible.get(to) else { return };
    let Some(column) = layout.get(col_idx) else { return };
    let Some(request) = store.get(request_id) else { return };
    let patient = request.patient.clone();
    let current = request.status;
    let column_name = column.name.clone();

    match column.id.status() {
        Some(Status::Cancelled) => {
            if current != Status::Cancelled {
                state.mode = Mode::Confirm {
                    prompt: format!("Deseja realmente cancelar o chamado de {patient}?"),
                    target: ConfirmTarget::CancelRequest(request_id),
                };
            }
        }
        Some(status) => {
            if current != status {
                let result = store.set_status(request_id, status);
                report(state, result);
                append_activity(
                    despacho_dir,
                    "status",
                    request_id,
                    &patient,
                    &[("to", status.as_str())],
                );
                state.focused_column = to;
                clamp_selection(store, layout, state);
                state.notify(format!("Movido para {column_name}"));
            }
        }
        None => {
            state.notify(format!("{column_name} é uma coluna visual: status mantido"));
        }
    }
}

fn handle_request_action(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) {
    match action {
        Action::MoveCardPrevColumn | Action::MoveCardNextColumn => {
            if state.view != View::Kanban {
                return;
            }
            let Some(id) = selected_request_id(store, layout, state) else { return };
            let to = if action == Action::MoveCardNextColumn {
                state.focused_column + 1
            } else {
                match state.focused_column.checked_sub(1) {
                    Some(to) => to,
                    None => return,
                }
            };
            drop_card_on_column(store, layout, state, id, to, despacho_dir);
        }
        Action::MoveToColumn => {
            let Some(id) = selected_request_id(store, layout, state) else { return };
            let items: Vec<String> = layout.columns().iter().map(|c| c.name.clone()).collect();
            state.mode = Mode::Picker {
                title: "Mover para coluna".into(),
                items,
                selected: 0,
                target: PickerTarget::MoveToColumn(id),
            };
        }
        Action::NewRequest => {
            state.mode = Mode::Form { form: RequestForm::new(None) };
        }
        Action::EditRequest => {
            let Some(id) = selected_request_id(store, layout, state) else { return };
            if let Some(request) = store.get(id) {
                state.mode = Mode::Form { form: RequestForm::new(Some(request)) };
            }
        }
        Action::MarkUrgent => {
            let Some(id) = selected_request_id(store, layout, state) else { return };
            let patient = store.get(id).map(|r| r.patient.clone()).unwrap_or_default();
            let result = store.mark_urgent(id);
            report(state, result);
            append_activity(despacho_dir, "urgent", id, &patient, &[]);
            clamp_selection(store, layout, state);
            state.notify(format!("{patient} marcado como urgente"));
        }
        Action::CancelRequest => {
            let Some(id) = selected_request_id(store, layout, state) else { return };
            if let Some(request) = store.get(id) {
                if request.status == Status::Cancelled {
                    state.notify("Chamado já cancelado");
                    return;
                }
                state.mode = Mode::Confirm {
                    prompt: format!(
                        "Deseja realmente cancelar o chamado de {}?",
                        request.patient
                    ),
                    target: ConfirmTarget::CancelRequest(id),
                };
            }
        }
        Action::ShowLinks => {
            if let Some(id) = selected_request_id(store, layout, state) {
                state.mode = Mode::Links { request_id: id };
            }
        }
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Column management
// ---------------------------------------------------------------------------

/// Palette offered by the color picker. The data layer accepts any tag;
/// this is just what the UI proposes.
pub const COLOR_PALETTE: &[&str] = &[
    "red", "blue", "purple", "green", "gray", "yellow", "orange", "pink",
];

fn handle_column_action(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) {
    let visible = visible_columns(layout, &state.filters);
    let focused_id = visible
        .get(state.focused_column)
        .and_then(|&i| layout.get(i))
        .map(|c| c.id.clone());

    match action {
        Action::ColAdd => {
            state.mode = Mode::Input {
                prompt: "Nome da nova coluna".into(),
                buf: TextBuffer::empty(),
                target: InputTarget::AddColumn,
            };
        }
        Action::ColRename => {
            let Some(id) = focused_id else { return };
            let Some(column) = layout.find(&id) else { return };
            if !column.editable {
                state.mode = Mode::Normal;
                state.notify("A coluna de cancelados não pode ser renomeada");
                return;
            }
            state.mode = Mode::Input {
                prompt: "Novo nome da coluna".into(),
                buf: TextBuffer::new(column.name.clone()),
                target: InputTarget::RenameColumn(id),
            };
        }
        Action::ColDelete => {
            let Some(id) = focused_id else { return };
            let Some(column) = layout.find(&id) else { return };
            if !column.custom {
                state.mode = Mode::Normal;
                state.notify("Apenas colunas personalizadas podem ser excluídas");
                return;
            }
            state.mode = Mode::Confirm {
                prompt: format!("Excluir a coluna \"{}\"?", column.name),
                target: ConfirmTarget::DeleteColumn(id),
            };
        }
        Action::ColPickColor => {
            let Some(id) = focused_id else { return };
            let current = layout.find(&id).and_then(|c| c.color.clone());
            let selected = current
                .as_deref()
                .and_then(|c| COLOR_PALETTE.iter().position(|p| *p == c))
                .unwrap_or(0);
            state.mode = Mode::Picker {
                title: "Cor da coluna".into(),
                items: COLOR_PALETTE.iter().map(|c| c.to_string()).collect(),
                selected,
                target: PickerTarget::ColumnColor(id),
            };
        }
        Action::ColMoveLeft | Action::ColMoveRight => {
            let from = match visible.get(state.focused_column) {
                Some(&i) => i,
                None => return,
            };
            let to = if action == Action::ColMoveRight {
                from + 1
            } else {
                match from.checked_sub(1) {
                    Some(to) => to,
                    None => return,
                }
            };
            if to >= layout.len() {
                return;
            }
            layout.move_column(from, to);
            let result = save_layout(despacho_dir, layout);
            report(state, result);
            state.focused_column = to;
            clamp_selection(store, layout, state);
        }
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Text input (login, search, input modal, picker confirm)
// ---------------------------------------------------------------------------

/// The buffer currently receiving text, if any. In Form mode that is the
/// focused field; the Priority field has no buffer.
fn active_buffer(mode: &mut Mode) -> Option<&mut TextBuffer> {
    match mode {
        Mode::Input { buf, .. } | Mode::Filter { buf } | Mode::Login { buf } => Some(buf),
        Mode::Form { form } => form.focused_buffer(),
        _ => None,
    }
}

fn handle_input(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) {
    // The Priority field has no text buffer; space and arrows cycle it.
    if let Mode::Form { form } = &mut state.mode {
        if form.focus == FormField::Priority {
            match action {
                Action::InputChar(' ') | Action::InputRight => {
                    form.priority = form.priority.next();
                    return;
                }
                Action::InputLeft => {
                    form.priority = form.priority.prev();
                    return;
                }
                _ => {}
            }
        }
    }

    match action {
        Action::InputChar(c) => {
            let is_search = matches!(state.mode, Mode::Filter { .. });
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.insert(c);
            }
            if is_search {
                sync_search(state);
                clamp_selection(store, layout, state);
            }
        }
        Action::InputBackspace => {
            let is_search = matches!(state.mode, Mode::Filter { .. });
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.backspace();
            }
            if is_search {
                sync_search(state);
                clamp_selection(store, layout, state);
            }
        }
        Action::InputLeft => {
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.move_left();
            }
        }
        Action::InputRight => {
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.move_right();
            }
        }
        Action::InputHome => {
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.home();
            }
        }
        Action::InputEnd => {
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.end();
            }
        }
        Action::InputDeleteWord => {
            let is_search = matches!(state.mode, Mode::Filter { .. });
            if let Some(buf) = active_buffer(&mut state.mode) {
                buf.delete_word();
            }
            if is_search {
                sync_search(state);
                clamp_selection(store, layout, state);
            }
        }
        Action::InputConfirm => {
            handle_input_confirm(store, layout, state, despacho_dir);
        }
        Action::InputCancel => {
            match &state.mode {
                Mode::Login { .. } => {
                    // Esc on the login screen quits.
                    state.should_quit = true;
                    return;
                }
                Mode::Filter { .. } => {
                    state.filters.search.clear();
                    clamp_selection(store, layout, state);
                }
                _ => {}
            }
            state.mode = Mode::Normal;
        }
        _ => unreachable!(),
    }
}

/// Process InputConfirm for Login, Input, Filter, and Picker modes.
fn handle_input_confirm(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    despacho_dir: &std::path::Path,
) {
    let old_mode = std::mem::replace(&mut state.mode, Mode::Normal);

    match old_mode {
        Mode::Login { buf } => {
            let operator = buf.input.trim().to_string();
            if operator.is_empty() {
                state.mode = Mode::Login { buf };
                state.notify_error("Informe o nome do operador");
                return;
            }
            let session = Session { operator: operator.clone(), authenticated: true };
            if let Err(err) = save_session(despacho_dir, &session) {
                state.notify_error(format!("Falha ao gravar sessão: {err}"));
            }
            state.operator = operator;
        }
        Mode::Input { buf, target: InputTarget::AddColumn, .. } => {
            if layout.add_custom(&buf.input, state.clock).is_some() {
                let result = save_layout(despacho_dir, layout);
                report(state, result);
                state.notify("Coluna adicionada");
            }
        }
        Mode::Input { buf, target: InputTarget::RenameColumn(id), .. } => {
            if layout.rename(&id, &buf.input) {
                let result = save_layout(despacho_dir, layout);
                report(state, result);
                state.notify("Coluna renomeada");
            }
        }
        Mode::Filter { buf } => {
            state.filters.search = buf.input.trim().to_string();
            clamp_selection(store, layout, state);
        }
        Mode::Picker { items, selected, target, .. } => {
            let choice = items.get(selected).cloned();
            match target {
                PickerTarget::StatusFilter => {
                    state.filters.status = choice
                        .and_then(|c| Status::ALL.iter().find(|s| s.label() == c).copied());
                    state.focused_column = 0;
                    clamp_selection(store, layout, state);
                }
                PickerTarget::PriorityFilter => {
                    state.filters.priority = choice
                        .and_then(|c| Priority::ALL.iter().find(|p| p.label() == c).copied());
                    clamp_selection(store, layout, state);
                }
                PickerTarget::WaitFilter => {
                    state.filters.wait = choice
                        .and_then(|c| WaitBucket::ALL.iter().find(|b| b.label() == c).copied());
                    clamp_selection(store, layout, state);
                }
                PickerTarget::MoveToColumn(id) => {
                    if let Some(to) = choice
                        .and_then(|name| layout.columns().iter().position(|c| c.name == name))
                    {
                        // The picker lists every layout column, so translate
                        // to a visible offset first.
                        let visible = visible_columns(layout, &state.filters);
                        match visible.iter().position(|&i| i == to) {
                            Some(offset) => {
                                drop_card_on_column(store, layout, state, id, offset, despacho_dir);
                            }
                            None => state.notify("Coluna oculta pelo filtro de status"),
                        }
                    }
                }
                PickerTarget::ColumnColor(id) => {
                    if let Some(color) = choice {
                        layout.set_color(&id, Some(color));
                        let result = save_layout(despacho_dir, layout);
                        report(state, result);
                    }
                }
            }
        }
        other => state.mode = other,
    }
}

// ---------------------------------------------------------------------------
// Request form
// ---------------------------------------------------------------------------

fn handle_form(
    store: &mut RequestStore,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) {
    match action {
        Action::FormNextField => {
            if let Mode::Form { form } = &mut state.mode {
                form.next_field();
            }
        }
        Action::FormPrevField => {
            if let Mode::Form { form } = &mut state.mode {
                form.prev_field();
            }
        }
        Action::FormLookupCep => {
            let lookup_target = match &state.mode {
                Mode::Form { form } => match form.focus {
                    FormField::CepOrigin | FormField::Origin => {
                        Some((FormField::Origin, form.cep_origin.input.clone()))
                    }
                    FormField::CepDestination | FormField::Destination => {
                        Some((FormField::Destination, form.cep_destination.input.clone()))
                    }
                    _ => None,
                },
                _ => None,
            };
            let Some((field, cep)) = lookup_target else { return };
            match lookup::fetch_address(&cep) {
                Ok(address) => {
                    if let Mode::Form { form } = &mut state.mode {
                        match field {
                            FormField::Origin => {
                                form.origin = TextBuffer::new(address);
                                form.cep_origin = TextBuffer::empty();
                                form.focus = FormField::Origin;
                            }
                            FormField::Destination => {
                                form.destination = TextBuffer::new(address);
                                form.cep_destination = TextBuffer::empty();
                                form.focus = FormField::Destination;
                            }
                            _ => {}
                        }
                    }
                    state.notify("Endereço preenchido pelo CEP");
                }
                Err(err) => state.open_notice(err.to_string()),
            }
        }
        Action::FormSubmit => {
            let Mode::Form { form } = &mut state.mode else { return };
            if !form.validate() {
                return;
            }
            let form = form.clone();
            state.mode = Mode::Normal;
            match form.editing {
                Some(id) => {
                    let result = store.update(id, form.patch());
                    report(state, result);
                    append_activity(despacho_dir, "update", id, form.patient.input.trim(), &[]);
                    state.notify("Chamado atualizado");
                }
                None => match store.create(form.draft(), state.clock) {
                    Ok(created) => {
                        append_activity(
                            despacho_dir,
                            "create",
                            created.id,
                            &created.patient,
                            &[("priority", created.priority.as_str())],
                        );
                        state.notify("Chamado criado");
                    }
                    Err(err) => state.notify_error(format!("Falha ao gravar: {err}")),
                },
            }
        }
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Confirmation (cancel request, delete column)
// ---------------------------------------------------------------------------

fn handle_confirm(
    store: &mut RequestStore,
    layout: &mut Layout,
    state: &mut AppState,
    action: Action,
    despacho_dir: &std::path::Path,
) {
    match action {
        Action::Confirm => {
            let target = match &state.mode {
                Mode::Confirm { target, .. } => target.clone(),
                _ => return,
            };
            state.mode = Mode::Normal;
            match target {
                ConfirmTarget::CancelRequest(id) => {
                    let patient = store.get(id).map(|r| r.patient.clone()).unwrap_or_default();
                    let result = store.cancel(id);
                    report(state, result);
                    append_activity(despacho_dir, "cancel", id, &patient, &[]);
                    clamp_selection(store, layout, state);
                    state.notify("Chamado cancelado");
                }
                ConfirmTarget::DeleteColumn(id) => {
                    if layout.remove_custom(&id) {
                        let result = save_layout(despacho_dir, layout);
                        report(state, result);
                        // Requests can only hold pipeline statuses, so the
                        // stranded set is empty unless the file drifted.
                        match store.reassign_stranded(&layout.statuses()) {
                            Ok(0) => state.notify("Coluna excluída"),
                            Ok(moved) => state.notify(format!(
                                "Coluna excluída: {moved} chamado(s) voltaram para Triagem"
                            )),
                            Err(err) => state.notify_error(format!("Falha ao gravar: {err}")),
                        }
                        clamp_selection(store, layout, state);
                    }
                }
            }
        }
        Action::Deny => {
            state.mode = Mode::Normal;
        }
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Filter pickers
// ---------------------------------------------------------------------------

fn open_filter_picker(state: &mut AppState, action: Action) {
    match action {
        Action::PickStatusFilter => {
            let mut items = vec![WILDCARD.to_string()];
            items.extend(Status::ALL.iter().map(|s| s.label().to_string()));
            state.mode = Mode::Picker {
                title: "Filtrar por status".into(),
                items,
                selected: 0,
                target: PickerTarget::StatusFilter,
            };
        }
        Action::PickPriorityFilter => {
            let mut items = vec![WILDCARD.to_string()];
            items.extend(Priority::ALL.iter().map(|p| p.label().to_string()));
            state.mode = Mode::Picker {
                title: "Filtrar por prioridade".into(),
                items,
                selected: 0,
                target: PickerTarget::PriorityFilter,
            };
        }
        Action::PickWaitFilter => {
            if state.view == View::Kanban {
                state.notify("Filtro de espera disponível na visão Lista");
                return;
            }
            let mut items = vec![WILDCARD.to_string()];
            items.extend(WaitBucket::ALL.iter().map(|b| b.label().to_string()));
            state.mode = Mode::Picker {
                title: "Filtrar por espera".into(),
                items,
                selected: 0,
                target: PickerTarget::WaitFilter,
            };
        }
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::storage::init_dir;
    use crate::dispatch::store::MemoryPort;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn fixture() -> (RequestStore, Layout, AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        init_dir(dir.path()).unwrap();
        let store = RequestStore::open(Box::new(MemoryPort::empty()), now());
        let layout = Layout::default();
        let state = AppState::new(now());
        (store, layout, state, dir)
    }

    fn despacho(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join(".despacho")
    }

    #[test]
    fn text_buffer_insert_and_backspace() {
        let mut buf = TextBuffer::empty();
        for c in "Jo".chars() {
            buf.insert(c);
        }
        buf.insert('ã');
        buf.insert('o');
        assert_eq!(buf.input, "João");
        assert_eq!(buf.cursor, 4);
        buf.backspace();
        assert_eq!(buf.input, "Joã");
    }

    #[test]
    fn text_buffer_cursor_is_char_based() {
        let mut buf = TextBuffer::new("médio".into());
        buf.home();
        buf.move_right();
        buf.move_right();
        buf.insert('x');
        assert_eq!(buf.input, "méxdio");
    }

    #[test]
    fn text_buffer_delete_word() {
        let mut buf = TextBuffer::new("Rua São Paulo".into());
        buf.delete_word();
        assert_eq!(buf.input, "Rua São ");
        buf.delete_word();
        assert_eq!(buf.input, "Rua ");
    }

    #[test]
    fn form_validation_requires_core_fields() {
        let mut form = RequestForm::new(None);
        assert!(!form.validate());
        assert!(form.error_for(FormField::Patient).is_some());
        assert!(form.error_for(FormField::Phone).is_some());
        assert!(form.error_for(FormField::Origin).is_some());
        assert!(form.error_for(FormField::Destination).is_some());
        assert!(form.error_for(FormField::Notes).is_none());

        form.patient = TextBuffer::new("Ana".into());
        form.phone = TextBuffer::new("17 9999".into());
        form.origin = TextBuffer::new("Rua A".into());
        form.destination = TextBuffer::new("Hospital".into());
        assert!(form.validate());
        assert!(form.errors.is_empty());
    }

    #[test]
    fn form_prefills_from_existing_request() {
        let store = RequestStore::open(Box::new(MemoryPort::empty()), now());
        let request = &store.requests()[0];
        let form = RequestForm::new(Some(request));
        assert_eq!(form.editing, Some(request.id));
        assert_eq!(form.patient.input, request.patient);
        assert_eq!(form.priority, request.priority);
        assert!(form.cep_origin.input.is_empty());
    }

    #[test]
    fn form_field_cycle_wraps() {
        let mut form = RequestForm::new(None);
        for _ in 0..FormField::ALL.len() {
            form.next_field();
        }
        assert_eq!(form.focus, FormField::Patient);
        form.prev_field();
        assert_eq!(form.focus, FormField::Notes);
    }

    #[test]
    fn status_filter_narrows_kanban_columns() {
        let layout = Layout::default();
        let filters = Filters::default();
        assert_eq!(visible_columns(&layout, &filters).len(), 5);

        let filters = Filters { status: Some(Status::Allocated), ..Filters::default() };
        let visible = visible_columns(&layout, &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(
            layout.get(visible[0]).unwrap().id,
            ColumnId::Fixed(Status::Allocated)
        );
    }

    #[test]
    fn custom_columns_render_empty() {
        let (store, mut layout, state, _dir) = fixture();
        layout.add_custom("Aguardando Família", now());
        let idx = layout.len() - 1;
        assert!(column_requests(&store, &layout, idx, &state.filters).is_empty());
    }

    #[test]
    fn selected_request_resolves_in_kanban() {
        let (store, layout, mut state, _dir) = fixture();
        // Column 0 is Triage: only João (urgent seed) sits there.
        state.focused_column = 0;
        state.selected_card = 0;
        let id = selected_request_id(&store, &layout, &state).unwrap();
        assert_eq!(store.get(id).unwrap().patient, "João Silva");
        state.selected_card = 1;
        assert!(selected_request_id(&store, &layout, &state).is_none());
    }

    #[test]
    fn selected_request_resolves_in_list() {
        let (store, layout, mut state, _dir) = fixture();
        state.view = View::Lista;
        state.selected_card = 1;
        let id = selected_request_id(&store, &layout, &state).unwrap();
        assert_eq!(store.get(id).unwrap().patient, "Maria Santos");
    }

    #[test]
    fn clamp_selection_after_filter_change() {
        let (store, layout, mut state, _dir) = fixture();
        state.view = View::Lista;
        state.selected_card = 2;
        state.filters.search = "maria".into();
        clamp_selection(&store, &layout, &mut state);
        assert_eq!(state.selected_card, 0);
    }

    #[test]
    fn cancel_flow_requires_confirmation() {
        let (mut store, mut layout, mut state, dir) = fixture();
        let id = selected_request_id(&store, &layout, &state).unwrap();

        process_action(&mut store, &mut layout, &mut state, Action::CancelRequest, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Confirm { .. }));
        assert_ne!(store.get(id).unwrap().status, Status::Cancelled);

        process_action(&mut store, &mut layout, &mut state, Action::Deny, &despacho(&dir)).unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_ne!(store.get(id).unwrap().status, Status::Cancelled);

        process_action(&mut store, &mut layout, &mut state, Action::CancelRequest, &despacho(&dir))
            .unwrap();
        process_action(&mut store, &mut layout, &mut state, Action::Confirm, &despacho(&dir))
            .unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Cancelled);
        // The record survives cancellation.
        assert_eq!(store.requests().len(), 3);
    }

    #[test]
    fn move_card_right_updates_status() {
        let (mut store, mut layout, mut state, dir) = fixture();
        let id = selected_request_id(&store, &layout, &state).unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Triage);

        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::MoveCardNextColumn,
            &despacho(&dir),
        )
        .unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Allocated);
        assert_eq!(state.focused_column, 1);
    }

    #[test]
    fn move_card_onto_cancelled_asks_first() {
        let (mut store, mut layout, mut state, dir) = fixture();
        let id = store.requests()[0].id;
        // Jump the card to Completed, then push right into Cancelled.
        store.set_status(id, Status::Completed).unwrap();
        state.focused_column = 3;
        clamp_selection(&store, &layout, &mut state);

        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::MoveCardNextColumn,
            &despacho(&dir),
        )
        .unwrap();
        assert!(matches!(
            state.mode,
            Mode::Confirm { target: ConfirmTarget::CancelRequest(_), .. }
        ));
        assert_eq!(store.get(id).unwrap().status, Status::Completed);
    }

    #[test]
    fn move_card_onto_custom_column_keeps_status() {
        let (mut store, mut layout, mut state, dir) = fixture();
        layout.add_custom("Aguardando Família", now());
        // Put the custom column right after Triage.
        layout.move_column(5, 1);

        let id = selected_request_id(&store, &layout, &state).unwrap();
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::MoveCardNextColumn,
            &despacho(&dir),
        )
        .unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Triage);
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn move_to_filtered_out_column_reports_instead_of_noop() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.filters.status = Some(Status::Triage);
        clamp_selection(&store, &layout, &mut state);
        let id = selected_request_id(&store, &layout, &state).unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Triage);

        process_action(&mut store, &mut layout, &mut state, Action::MoveToColumn, &despacho(&dir))
            .unwrap();
        // The picker lists every column even though the filter only shows
        // Triagem: index 1 is Alocado, hidden right now.
        if let Mode::Picker { selected, .. } = &mut state.mode {
            *selected = 1;
        } else {
            panic!("expected picker");
        }
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert_eq!(store.get(id).unwrap().status, Status::Triage);
        assert!(state.notification.as_deref().is_some_and(|n| n.contains("oculta")));
    }

    #[test]
    fn mark_urgent_promotes_and_logs() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.view = View::Lista;
        state.selected_card = 2; // Pedro Costa, medium priority
        let id = selected_request_id(&store, &layout, &state).unwrap();

        process_action(&mut store, &mut layout, &mut state, Action::MarkUrgent, &despacho(&dir))
            .unwrap();
        let request = store.get(id).unwrap();
        assert_eq!(request.priority, Priority::Urgent);
        assert_eq!(store.requests()[1].id, id);

        let log = crate::dispatch::storage::read_activity(&despacho(&dir)).unwrap();
        assert!(log.iter().any(|l| l.contains("\"action\":\"urgent\"")));
    }

    #[test]
    fn form_submit_creates_request() {
        let (mut store, mut layout, mut state, dir) = fixture();
        process_action(&mut store, &mut layout, &mut state, Action::NewRequest, &despacho(&dir))
            .unwrap();
        if let Mode::Form { form } = &mut state.mode {
            form.patient = TextBuffer::new("Ana Souza".into());
            form.phone = TextBuffer::new("(17) 90000-1111".into());
            form.origin = TextBuffer::new("Rua B, 22".into());
            form.destination = TextBuffer::new("Santa Casa".into());
        } else {
            panic!("expected form mode");
        }
        process_action(&mut store, &mut layout, &mut state, Action::FormSubmit, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(store.requests().len(), 4);
        let created = store.requests().last().unwrap();
        assert_eq!(created.patient, "Ana Souza");
        assert_eq!(created.status, Status::Triage);
    }

    #[test]
    fn form_submit_blocked_while_invalid() {
        let (mut store, mut layout, mut state, dir) = fixture();
        process_action(&mut store, &mut layout, &mut state, Action::NewRequest, &despacho(&dir))
            .unwrap();
        process_action(&mut store, &mut layout, &mut state, Action::FormSubmit, &despacho(&dir))
            .unwrap();
        match &state.mode {
            Mode::Form { form } => {
                assert!(form.error_for(FormField::Patient).is_some());
            }
            _ => panic!("expected form mode"),
        }
        assert_eq!(store.requests().len(), 3);
    }

    #[test]
    fn form_chars_go_to_the_focused_field() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.mode = Mode::Form { form: RequestForm::new(None) };
        for c in "Ana".chars() {
            process_action(
                &mut store,
                &mut layout,
                &mut state,
                Action::InputChar(c),
                &despacho(&dir),
            )
            .unwrap();
        }
        process_action(&mut store, &mut layout, &mut state, Action::FormNextField, &despacho(&dir))
            .unwrap();
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::InputChar('1'),
            &despacho(&dir),
        )
        .unwrap();
        match &state.mode {
            Mode::Form { form } => {
                assert_eq!(form.patient.input, "Ana");
                assert_eq!(form.phone.input, "1");
            }
            _ => panic!("expected form mode"),
        }
    }

    #[test]
    fn priority_field_cycles_with_space_and_arrows() {
        let (mut store, mut layout, mut state, dir) = fixture();
        let mut form = RequestForm::new(None);
        form.focus = FormField::Priority;
        state.mode = Mode::Form { form };

        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::InputChar(' '),
            &despacho(&dir),
        )
        .unwrap();
        match &state.mode {
            Mode::Form { form } => assert_eq!(form.priority, Priority::High),
            _ => panic!("expected form mode"),
        }

        process_action(&mut store, &mut layout, &mut state, Action::InputLeft, &despacho(&dir))
            .unwrap();
        match &state.mode {
            Mode::Form { form } => assert_eq!(form.priority, Priority::Medium),
            _ => panic!("expected form mode"),
        }
    }

    #[test]
    fn form_submit_edits_request() {
        let (mut store, mut layout, mut state, dir) = fixture();
        let id = store.requests()[1].id;
        state.mode = Mode::Form {
            form: RequestForm::new(store.get(id)),
        };
        if let Mode::Form { form } = &mut state.mode {
            form.notes = TextBuffer::new("Paciente acamado".into());
            form.priority = Priority::Urgent;
        }
        process_action(&mut store, &mut layout, &mut state, Action::FormSubmit, &despacho(&dir))
            .unwrap();
        let request = store.get(id).unwrap();
        assert_eq!(request.notes, "Paciente acamado");
        assert_eq!(request.priority, Priority::Urgent);
        // Status is untouched by the form.
        assert_eq!(request.status, Status::Allocated);
    }

    #[test]
    fn column_delete_flow_keeps_statuses() {
        let (mut store, mut layout, mut state, dir) = fixture();
        layout.add_custom("Aguardando Família", now());
        save_layout(&despacho(&dir), &layout).unwrap();
        state.focused_column = 5;
        state.mode = Mode::Column;

        process_action(&mut store, &mut layout, &mut state, Action::ColDelete, &despacho(&dir))
            .unwrap();
        assert!(matches!(
            state.mode,
            Mode::Confirm { target: ConfirmTarget::DeleteColumn(_), .. }
        ));
        process_action(&mut store, &mut layout, &mut state, Action::Confirm, &despacho(&dir))
            .unwrap();
        assert_eq!(layout.len(), 5);
        // Statuses only live in the five fixed columns, so nothing moves.
        assert_eq!(store.requests()[0].status, Status::Triage);
        assert_eq!(store.requests().len(), 3);
    }

    #[test]
    fn fixed_column_delete_is_refused() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.focused_column = 4; // Cancelled
        state.mode = Mode::Column;
        process_action(&mut store, &mut layout, &mut state, Action::ColDelete, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn locked_column_rename_is_refused() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.focused_column = 4; // Cancelled
        state.mode = Mode::Column;
        process_action(&mut store, &mut layout, &mut state, Action::ColRename, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(layout.get(4).unwrap().name, "Cancelado");
    }

    #[test]
    fn add_column_via_input_modal() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.mode = Mode::Column;
        process_action(&mut store, &mut layout, &mut state, Action::ColAdd, &despacho(&dir))
            .unwrap();
        for c in "Retorno".chars() {
            process_action(
                &mut store,
                &mut layout,
                &mut state,
                Action::InputChar(c),
                &despacho(&dir),
            )
            .unwrap();
        }
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert_eq!(layout.len(), 6);
        assert_eq!(layout.columns().last().unwrap().name, "Retorno");
        assert!(layout.columns().last().unwrap().custom);
    }

    #[test]
    fn login_requires_operator_name() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.mode = Mode::Login { buf: TextBuffer::empty() };
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Login { .. }));

        state.mode = Mode::Login { buf: TextBuffer::new("Plantonista".into()) };
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(state.operator, "Plantonista");
        assert!(load_session(&despacho(&dir)).is_some());
    }

    #[test]
    fn logout_clears_session_and_returns_to_login() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.operator = "Plantonista".into();
        save_session(
            &despacho(&dir),
            &Session { operator: "Plantonista".into(), authenticated: true },
        )
        .unwrap();

        process_action(&mut store, &mut layout, &mut state, Action::Logout, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Login { .. }));
        assert!(state.operator.is_empty());
        assert!(load_session(&despacho(&dir)).is_none());
    }

    #[test]
    fn search_updates_live() {
        let (mut store, mut layout, mut state, dir) = fixture();
        process_action(&mut store, &mut layout, &mut state, Action::StartSearch, &despacho(&dir))
            .unwrap();
        for c in "maria".chars() {
            process_action(
                &mut store,
                &mut layout,
                &mut state,
                Action::InputChar(c),
                &despacho(&dir),
            )
            .unwrap();
        }
        assert_eq!(state.filters.search, "maria");
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(state.filters.search, "maria");
    }

    #[test]
    fn search_cancel_clears_the_text() {
        let (mut store, mut layout, mut state, dir) = fixture();
        process_action(&mut store, &mut layout, &mut state, Action::StartSearch, &despacho(&dir))
            .unwrap();
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::InputChar('x'),
            &despacho(&dir),
        )
        .unwrap();
        process_action(&mut store, &mut layout, &mut state, Action::InputCancel, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Normal));
        assert!(state.filters.search.is_empty());
    }

    #[test]
    fn status_picker_sets_and_clears_filter() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.view = View::Lista;
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::PickStatusFilter,
            &despacho(&dir),
        )
        .unwrap();
        // Wildcard + Triagem + Alocado: index 2 selects Alocado.
        if let Mode::Picker { selected, .. } = &mut state.mode {
            *selected = 2;
        } else {
            panic!("expected picker");
        }
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert_eq!(state.filters.status, Some(Status::Allocated));

        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::PickStatusFilter,
            &despacho(&dir),
        )
        .unwrap();
        process_action(&mut store, &mut layout, &mut state, Action::InputConfirm, &despacho(&dir))
            .unwrap();
        assert_eq!(state.filters.status, None);
    }

    #[test]
    fn wait_picker_only_in_list_view() {
        let (mut store, mut layout, mut state, dir) = fixture();
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::PickWaitFilter,
            &despacho(&dir),
        )
        .unwrap();
        assert!(matches!(state.mode, Mode::Normal));

        state.view = View::Lista;
        process_action(
            &mut store,
            &mut layout,
            &mut state,
            Action::PickWaitFilter,
            &despacho(&dir),
        )
        .unwrap();
        assert!(matches!(state.mode, Mode::Picker { .. }));
    }

    #[test]
    fn notice_returns_to_stashed_mode() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.mode = Mode::Form { form: RequestForm::new(None) };
        state.open_notice("CEP não encontrado");
        assert!(matches!(state.mode, Mode::Notice { .. }));

        process_action(&mut store, &mut layout, &mut state, Action::DismissNotice, &despacho(&dir))
            .unwrap();
        assert!(matches!(state.mode, Mode::Form { .. }));
    }

    #[test]
    fn quit_from_modal_returns_to_normal_first() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.mode = Mode::Help;
        process_action(&mut store, &mut layout, &mut state, Action::Quit, &despacho(&dir)).unwrap();
        assert!(!state.should_quit);
        assert!(matches!(state.mode, Mode::Normal));
        process_action(&mut store, &mut layout, &mut state, Action::Quit, &despacho(&dir)).unwrap();
        assert!(state.should_quit);
    }

    #[test]
    fn toggle_view_resets_selection() {
        let (mut store, mut layout, mut state, dir) = fixture();
        state.focused_column = 2;
        state.selected_card = 1;
        process_action(&mut store, &mut layout, &mut state, Action::ToggleView, &despacho(&dir))
            .unwrap();
        assert_eq!(state.view, View::Lista);
        assert_eq!(state.focused_column, 0);
        assert_eq!(state.selected_card, 0);
    }
}
