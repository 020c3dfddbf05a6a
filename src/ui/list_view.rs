use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Row, Table};
use ratatui::Frame;

use super::theme::Theme;
use crate::app::{list_requests, AppState};
use crate::dispatch::store::RequestStore;
use crate::dispatch::wait::{format_wait, wait_minutes};

/// Flat table over the whole collection: one row per request, urgent
/// block first, wait time color-coded.
pub fn render_list(f: &mut Frame, area: Rect, store: &RequestStore, state: &AppState) {
    let requests = list_requests(store, state);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(Span::styled(
            format!(" Chamados ({}) ", requests.len()),
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ));

    if requests.is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        f.render_widget(
            ratatui::widgets::Paragraph::new(Span::styled(
                "Nenhum chamado corresponde aos filtros.",
                Theme::dim_style(),
            )),
            inner,
        );
        return;
    }

    let header = Row::new(vec![
        Cell::from("Espera"),
        Cell::from("Paciente"),
        Cell::from("Telefone"),
        Cell::from("Prioridade"),
        Cell::from("Status"),
        Cell::from("Destino"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

    let rows: Vec<Row> = requests
        .iter()
        .enumerate()
        .map(|(i, request)| {
            let minutes = wait_minutes(request.created_at, state.clock);
            let selected = i == state.selected_card;
            let row_mod = if selected {
                Modifier::BOLD | Modifier::REVERSED
            } else {
                Modifier::empty()
            };
            Row::new(vec![
                Cell::from(Span::styled(
                    format_wait(minutes),
                    Style::default().fg(Theme::wait_color(minutes)),
                )),
                Cell::from(request.patient.as_str()),
                Cell::from(Span::styled(request.phone.as_str(), Theme::dim_style())),
                Cell::from(Span::styled(
                    request.priority.label(),
                    Style::default().fg(Theme::priority_color(request.priority)),
                )),
                Cell::from(Span::styled(
                    request.status.label(),
                    Style::default().fg(Theme::status_color(request.status)),
                )),
                Cell::from(Span::styled(request.destination.as_str(), Theme::dim_style())),
            ])
            .style(Style::default().add_modifier(row_mod))
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Min(16),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Min(16),
        ],
    )
    .header(header)
    .block(block)
    .column_spacing(1);

    f.render_widget(table, area);
}
