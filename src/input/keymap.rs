use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::action::Action;
use crate::app::Mode;

/// Map a key event to a semantic action based on current mode.
pub fn map_key(key: KeyEvent, mode: &Mode) -> Action {
    match mode {
        Mode::Login { .. } => map_input(key),
        Mode::Normal => map_normal(key),
        Mode::Column => map_column(key),
        Mode::Filter { .. } => map_input(key),
        Mode::Form { .. } => map_form(key),
        Mode::Input { .. } => map_input(key),
        Mode::Confirm { .. } => map_confirm(key),
        Mode::Picker { .. } => map_picker(key),
        Mode::Links { .. } => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => Action::ClosePanel,
            _ => Action::None,
        },
        Mode::Notice { .. } => Action::DismissNotice,
        Mode::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Action::ClosePanel,
            _ => Action::None,
        },
    }
}

fn map_normal(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => Action::FocusPrevColumn,
        KeyCode::Char('l') | KeyCode::Right => Action::FocusNextColumn,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNextCard,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevCard,
        KeyCode::Char('H') => Action::MoveCardPrevColumn,
        KeyCode::Char('L') => Action::MoveCardNextColumn,
        KeyCode::Char('n') => Action::NewRequest,
        KeyCode::Char('e') | KeyCode::Enter => Action::EditRequest,
        KeyCode::Char('u') => Action::MarkUrgent,
        KeyCode::Char('x') => Action::CancelRequest,
        KeyCode::Char('m') => Action::MoveToColumn,
        KeyCode::Char('o') => Action::ShowLinks,
        KeyCode::Char('v') => Action::ToggleView,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('s') => Action::PickStatusFilter,
        KeyCode::Char('p') => Action::PickPriorityFilter,
        KeyCode::Char('w') => Action::PickWaitFilter,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('c') => Action::EnterColumnMode,
        KeyCode::Char('Q') => Action::Logout,
        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => Action::ClearFilters,
        _ => Action::None,
    }
}

/// Map keys for column-management mode, entered by pressing `c` in Normal
/// mode.
fn map_column(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('a') => Action::ColAdd,
        KeyCode::Char('r') => Action::ColRename,
        KeyCode::Char('d') => Action::ColDelete,
        KeyCode::Char('c') => Action::ColPickColor,
        KeyCode::Char('h') | KeyCode::Left => Action::ColMoveLeft,
        KeyCode::Char('l') | KeyCode::Right => Action::ColMoveRight,
        KeyCode::Esc => Action::ClosePanel,
        _ => Action::None,
    }
}

fn map_form(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Tab | KeyCode::Down => Action::FormNextField,
        KeyCode::BackTab | KeyCode::Up => Action::FormPrevField,
        KeyCode::Enter => Action::FormSubmit,
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Action::FormLookupCep
        }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputHome,
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputEnd,
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Action::InputDeleteWord
        }
        KeyCode::Char(c) => Action::InputChar(c),
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Left => Action::InputLeft,
        KeyCode::Right => Action::InputRight,
        KeyCode::Home => Action::InputHome,
        KeyCode::End => Action::InputEnd,
        _ => Action::None,
    }
}

fn map_input(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::InputConfirm,
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputHome,
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputEnd,
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Action::InputDeleteWord
        }
        KeyCode::Char(c) => Action::InputChar(c),
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Left => Action::InputLeft,
        KeyCode::Right => Action::InputRight,
        KeyCode::Home => Action::InputHome,
        KeyCode::End => Action::InputEnd,
        _ => Action::None,
    }
}

fn map_confirm(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('s') | KeyCode::Enter => Action::Confirm,
        KeyCode::Char('n') | KeyCode::Esc => Action::Deny,
        _ => Action::None,
    }
}

fn map_picker(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNextCard,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevCard,
        KeyCode::Enter | KeyCode::Char(' ') => Action::InputConfirm,
        KeyCode::Esc => Action::InputCancel,
        _ => Action::None,
    }
}

// ---------------------------------------------------------------------------
// Binding registry — single source of truth for keybinding documentation.
// Used by the help overlay and status bar hints.
// ---------------------------------------------------------------------------

/// A documented keybinding for display in help/hints.
pub struct Binding {
    pub key: &'static str,
    pub description: &'static str,
}

/// A group of related bindings (one section in help).
pub struct BindingGroup {
    pub name: &'static str,
    pub bindings: &'static [Binding],
}

pub const NORMAL_BINDINGS: &[Binding] = &[
    Binding { key: "h / l", description: "Mudar de coluna" },
    Binding { key: "j / k", description: "Mover entre chamados" },
    Binding { key: "H / L", description: "Mover chamado entre colunas" },
    Binding { key: "n", description: "Novo chamado" },
    Binding { key: "e / Enter", description: "Editar chamado" },
    Binding { key: "u", description: "Marcar urgente" },
    Binding { key: "x", description: "Cancelar chamado" },
    Binding { key: "m", description: "Mover para coluna..." },
    Binding { key: "o", description: "Links (mapa / WhatsApp)" },
    Binding { key: "v", description: "Alternar Kanban / Lista" },
    Binding { key: "/", description: "Buscar paciente ou telefone" },
    Binding { key: "s", description: "Filtrar por status (lista)" },
    Binding { key: "p", description: "Filtrar por prioridade" },
    Binding { key: "w", description: "Filtrar por espera (lista)" },
    Binding { key: "c", description: "Modo coluna" },
    Binding { key: "Esc", description: "Limpar filtros" },
    Binding { key: "Q", description: "Sair da sessão" },
    Binding { key: "?", description: "Ajuda" },
    Binding { key: "q", description: "Sair" },
];

pub const COLUMN_BINDINGS: &[Binding] = &[
    Binding { key: "a", description: "Adicionar coluna" },
    Binding { key: "r", description: "Renomear coluna" },
    Binding { key: "d", description: "Excluir coluna personalizada" },
    Binding { key: "c", description: "Cor da coluna" },
    Binding { key: "h / l", description: "Mover coluna" },
    Binding { key: "Esc", description: "Voltar" },
];

pub const FORM_BINDINGS: &[Binding] = &[
    Binding { key: "Tab / Shift-Tab", description: "Próximo / campo anterior" },
    Binding { key: "Enter", description: "Salvar chamado" },
    Binding { key: "Ctrl-B", description: "Buscar endereço pelo CEP" },
    Binding { key: "Esc", description: "Cancelar" },
];

/// All binding groups for the help overlay.
pub const HELP_GROUPS: &[BindingGroup] = &[
    BindingGroup { name: "Navegação", bindings: NORMAL_BINDINGS },
    BindingGroup { name: "Colunas (c)", bindings: COLUMN_BINDINGS },
    BindingGroup { name: "Formulário", bindings: FORM_BINDINGS },
];

/// Get bindings for a minor mode (for the status bar hint line).
pub fn mode_bindings(mode: &Mode) -> &'static [Binding] {
    match mode {
        Mode::Column => COLUMN_BINDINGS,
        Mode::Form { .. } => FORM_BINDINGS,
        _ => &[],
    }
}
