pub mod board_view;
pub mod form;
pub mod help;
pub mod list_view;
pub mod modal;
pub mod status_bar;
pub mod theme;

use ratatui::layout::{Constraint, Direction, Layout as RectLayout, Rect};
use ratatui::Frame;

use crate::app::{AppState, Mode, View};
use crate::dispatch::layout::Layout;
use crate::dispatch::store::RequestStore;

/// Create a centered rect within `area` using percentage-based sizing with minimums.
pub fn centered_rect(area: Rect, w_pct: u16, h_pct: u16, min_w: u16, min_h: u16) -> Rect {
    let width = (area.width * w_pct / 100).max(min_w).min(area.width);
    let height = (area.height * h_pct / 100).max(min_h).min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(f: &mut Frame, store: &RequestStore, layout: &Layout, state: &AppState) {
    // Login takes the whole screen; there is no board behind it yet.
    if let Mode::Login { buf } = &state.mode {
        modal::render_login(f, f.area(), buf, state);
        return;
    }

    let chunks = RectLayout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(f.area());

    match state.view {
        View::Kanban => board_view::render_board(f, chunks[0], store, layout, state),
        View::Lista => list_view::render_list(f, chunks[0], store, state),
    }

    status_bar::render_status_bar(f, chunks[1], store, layout, state);

    // Overlays
    match &state.mode {
        Mode::Column => {
            modal::render_hint_popup(f, chunks[0], &state.mode);
        }
        Mode::Picker { title, items, selected, .. } => {
            modal::render_picker(f, chunks[0], title, items, *selected);
        }
        Mode::Form { form } => {
            form::render_form(f, f.area(), form);
        }
        Mode::Links { request_id } => {
            if let Some(request) = store.get(*request_id) {
                modal::render_links(f, f.area(), request);
            }
        }
        Mode::Notice { message, .. } => {
            modal::render_notice(f, f.area(), message);
        }
        Mode::Help => {
            help::render_help(f, f.area());
        }
        _ => {}
    }
}
