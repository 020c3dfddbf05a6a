use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{
    column_requests, list_requests, visible_columns, AppState, Mode, NotificationLevel, View,
};
use crate::dispatch::layout::Layout;
use crate::dispatch::store::RequestStore;

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    store: &RequestStore,
    layout: &Layout,
    state: &AppState,
) {
    // Full-line modes (search, input modal, confirm) take over the bar.
    if let Some(line) = render_full_line_mode(state) {
        let paragraph = Paragraph::new(line).style(Theme::status_style());
        f.render_widget(paragraph, area);
        return;
    }

    let left = build_left_zone(state);
    let right = build_right_zone(store, layout, state);

    let left_width: usize = left.iter().map(|s| s.content.width()).sum();
    let right_width: usize = right.iter().map(|s| s.content.width()).sum();
    let center_avail = (area.width as usize).saturating_sub(left_width + right_width);
    let center = build_center_zone(state, center_avail);

    let mut spans = left;
    spans.extend(center);
    spans.extend(right);

    let paragraph = Paragraph::new(Line::from(spans)).style(Theme::status_style());
    f.render_widget(paragraph, area);
}

/// Left zone: mode badge, view name, operator, active filters.
fn build_left_zone(state: &AppState) -> Vec<Span<'_>> {
    let mode_str = match &state.mode {
        Mode::Normal => "NORMAL",
        Mode::Column => "COLUNA",
        Mode::Form { .. } => "FORMULÁRIO",
        Mode::Picker { .. } => "SELEÇÃO",
        Mode::Links { .. } => "LINKS",
        Mode::Notice { .. } => "AVISO",
        Mode::Help => "AJUDA",
        Mode::Login { .. } => "LOGIN",
        Mode::Input { .. } | Mode::Confirm { .. } | Mode::Filter { .. } => "",
    };

    let mut spans = vec![
        Span::styled(
            format!(" {mode_str} "),
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ),
        Span::raw(" "),
        Span::styled(format!("{} ", state.view.label()), Theme::dim_style()),
    ];

    if !state.operator.is_empty() {
        spans.push(Span::styled(format!("@{} ", state.operator), Theme::dim_style()));
    }

    if !state.filters.search.is_empty() {
        spans.push(Span::styled(
            format!("/{} ", state.filters.search),
            Style::default().fg(Theme::FG),
        ));
    }
    if let Some(status) = state.filters.status {
        spans.push(Span::styled(
            format!("[{}] ", status.label()),
            Style::default().fg(Theme::status_color(status)),
        ));
    }
    if let Some(priority) = state.filters.priority {
        spans.push(Span::styled(
            format!("[{}] ", priority.label()),
            Style::default().fg(Theme::priority_color(priority)),
        ));
    }
    if let Some(bucket) = state.filters.wait {
        spans.push(Span::styled(format!("[{}] ", bucket.label()), Style::default().fg(Theme::FG)));
    }

    spans
}

/// Right zone: focused column (or list) position.
fn build_right_zone<'a>(
    store: &RequestStore,
    layout: &'a Layout,
    state: &AppState,
) -> Vec<Span<'a>> {
    let mut spans = Vec::new();

    match state.view {
        View::Kanban => {
            let visible = visible_columns(layout, &state.filters);
            if let Some(&col_idx) = visible.get(state.focused_column) {
                if let Some(column) = layout.get(col_idx) {
                    let count = column_requests(store, layout, col_idx, &state.filters).len();
                    let pos = if count > 0 {
                        format!(" {}/{}", state.selected_card + 1, count)
                    } else {
                        " 0".to_string()
                    };
                    spans.push(Span::styled(
                        format!("{}[{}]", column.name, count),
                        Theme::dim_style(),
                    ));
                    spans.push(Span::styled(pos, Style::default().fg(Theme::FG)));
                }
            }
        }
        View::Lista => {
            let count = list_requests(store, state).len();
            let pos = if count > 0 {
                format!(" {}/{}", state.selected_card + 1, count)
            } else {
                " 0".to_string()
            };
            spans.push(Span::styled(format!("Lista[{count}]"), Theme::dim_style()));
            spans.push(Span::styled(pos, Style::default().fg(Theme::FG)));
        }
    }

    spans.push(Span::raw(" "));
    spans
}

/// Center zone: notification text padded to fill available width.
fn build_center_zone(state: &AppState, avail_width: usize) -> Vec<Span<'_>> {
    if let Some(ref notif) = state.notification {
        let notif_width = notif.width();
        let color = match state.notification_level {
            NotificationLevel::Info => Theme::FG,
            NotificationLevel::Error => Theme::STATUS_ERROR,
        };

        if notif_width >= avail_width {
            let truncated: String = notif.chars().take(avail_width).collect();
            return vec![Span::styled(truncated, Style::default().fg(color))];
        }

        let pad_total = avail_width - notif_width;
        let pad_left = pad_total / 2;
        let pad_right = pad_total - pad_left;

        vec![
            Span::raw(" ".repeat(pad_left)),
            Span::styled(notif.as_str(), Style::default().fg(color)),
            Span::raw(" ".repeat(pad_right)),
        ]
    } else {
        vec![Span::raw(" ".repeat(avail_width))]
    }
}

/// Render full-line modes (Filter, Input, Confirm).
fn render_full_line_mode(state: &AppState) -> Option<Line<'_>> {
    match &state.mode {
        Mode::Filter { buf } => {
            let spans = vec![
                Span::styled(
                    " / ",
                    Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD | Modifier::REVERSED),
                ),
                Span::raw(format!(" {}", buf.input)),
                Span::raw("_"),
            ];
            Some(Line::from(spans))
        }
        Mode::Input { prompt, buf, .. } => {
            let spans = vec![
                Span::styled(
                    format!(" {prompt} "),
                    Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD | Modifier::REVERSED),
                ),
                Span::raw(format!(" {}", buf.input)),
                Span::raw("_"),
            ];
            Some(Line::from(spans))
        }
        Mode::Confirm { prompt, .. } => {
            let spans = vec![Span::styled(
                format!(" {prompt} (s/n) "),
                Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD | Modifier::REVERSED),
            )];
            Some(Line::from(spans))
        }
        _ => None,
    }
}
