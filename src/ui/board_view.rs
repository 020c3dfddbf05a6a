use ratatui::layout::{Constraint, Direction, Layout as RectLayout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState,
};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{column_requests, visible_columns, AppState};
use crate::dispatch::layout::{Column, Layout};
use crate::dispatch::store::RequestStore;
use crate::dispatch::wait::{format_wait, wait_minutes};
use crate::dispatch::{CallRequest, Priority};

/// Short marker for a priority, shown on the card's first line. Medium is
/// the baseline and gets no marker.
pub(crate) fn priority_marker(priority: Priority) -> Option<&'static str> {
    match priority {
        Priority::Low => Some("·"),
        Priority::Medium => None,
        Priority::High => Some("!"),
        Priority::Urgent => Some("!!"),
    }
}

/// Truncate to `max_width` display columns, appending an ellipsis when cut.
pub(crate) fn truncate_text(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let avail = max_width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.to_string().width();
        if used + w > avail {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

pub fn render_board(
    f: &mut Frame,
    area: Rect,
    store: &RequestStore,
    layout: &Layout,
    state: &AppState,
) {
    let visible = visible_columns(layout, &state.filters);
    if visible.is_empty() {
        let msg = Paragraph::new("Nenhuma coluna visível. Esc limpa os filtros.");
        f.render_widget(msg, area);
        return;
    }

    let constraints: Vec<Constraint> = visible
        .iter()
        .map(|_| Constraint::Ratio(1, visible.len() as u32))
        .collect();
    let col_areas = RectLayout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (vis_idx, &col_idx) in visible.iter().enumerate() {
        let Some(column) = layout.get(col_idx) else { continue };
        let cards = column_requests(store, layout, col_idx, &state.filters);
        let is_focused = state.focused_column == vis_idx;
        render_column(f, col_areas[vis_idx], column, &cards, is_focused, state);
    }
}

fn render_column(
    f: &mut Frame,
    area: Rect,
    column: &Column,
    cards: &[&CallRequest],
    is_focused: bool,
    state: &AppState,
) {
    let accent = Theme::column_color(column);
    let focused_mod = if is_focused { Modifier::BOLD } else { Modifier::empty() };

    let header_line = Line::from(vec![
        Span::styled(
            format!(" {} ", column.name),
            Style::default().fg(Theme::COLUMN_HEADER).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("({})", cards.len()), Theme::dim_style()),
    ]);

    let border_color = if is_focused { accent } else { Theme::COLUMN_BORDER };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color).add_modifier(focused_mod))
        .border_type(BorderType::Rounded)
        .title(header_line)
        .padding(Padding::new(1, 1, 0, 0));

    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if cards.is_empty() && column.custom {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled("sem chamados", Theme::dim_style()))),
            Rect::new(inner.x, inner.y, inner.width, 1),
        );
        return;
    }

    // 3 inner lines + 2 border lines per card.
    let card_height: u16 = 5;
    let max_visible = (inner.height / card_height) as usize;

    let selected_in_col = if is_focused { state.selected_card } else { 0 };
    let scroll_offset = if cards.len() > max_visible && selected_in_col >= max_visible {
        selected_in_col - max_visible + 1
    } else {
        0
    };

    for (idx, request) in cards.iter().enumerate().skip(scroll_offset) {
        if idx - scroll_offset >= max_visible {
            break;
        }
        let y = inner.y + ((idx - scroll_offset) as u16 * card_height);
        let card_area = Rect::new(inner.x, y, inner.width, card_height);
        let is_selected = is_focused && state.selected_card == idx;
        render_card(f, card_area, request, is_selected, state);
    }

    if cards.len() > max_visible {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        let mut scrollbar_state = ScrollbarState::new(cards.len()).position(scroll_offset);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_card(f: &mut Frame, area: Rect, request: &CallRequest, is_selected: bool, state: &AppState) {
    if area.width < 4 || area.height < 3 {
        return;
    }

    let border_color = if request.is_urgent() {
        Theme::PRIORITY_URGENT
    } else if is_selected {
        Theme::CARD_BORDER
    } else {
        Theme::DIM
    };
    let selected_mod = if is_selected { Modifier::BOLD } else { Modifier::empty() };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color).add_modifier(selected_mod))
        .border_type(if is_selected { BorderType::Thick } else { BorderType::Rounded });

    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width < 2 {
        return;
    }

    let minutes = wait_minutes(request.created_at, state.clock);
    let wait = format_wait(minutes);

    // Line 1: wait time on the left, priority marker on the right.
    let marker = priority_marker(request.priority);
    let marker_width = marker.map(|m| m.width()).unwrap_or(0);
    let padding = (inner.width as usize).saturating_sub(wait.width() + marker_width + 1);
    let mut line1 = vec![
        Span::styled(" ".to_string() + &wait, Style::default().fg(Theme::wait_color(minutes))),
        Span::raw(" ".repeat(padding)),
    ];
    if let Some(m) = marker {
        line1.push(Span::styled(
            m,
            Style::default().fg(Theme::priority_color(request.priority)),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(line1)),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );

    // Line 2: patient name.
    if inner.height >= 2 {
        let name = truncate_text(&request.patient, (inner.width as usize).saturating_sub(1));
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!(" {name}"),
                Style::default().fg(Theme::CARD_TITLE).add_modifier(selected_mod),
            ))),
            Rect::new(inner.x, inner.y + 1, inner.width, 1),
        );
    }

    // Line 3: destination, dimmed.
    if inner.height >= 3 {
        let dest = truncate_text(&request.destination, (inner.width as usize).saturating_sub(3));
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(format!(" → {dest}"), Theme::dim_style()))),
            Rect::new(inner.x, inner.y + 2, inner.width, 1),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_markers() {
        assert_eq!(priority_marker(Priority::Low), Some("·"));
        assert_eq!(priority_marker(Priority::Medium), None);
        assert_eq!(priority_marker(Priority::High), Some("!"));
        assert_eq!(priority_marker(Priority::Urgent), Some("!!"));
    }

    #[test]
    fn truncate_text_short_is_unchanged() {
        assert_eq!(truncate_text("Maria", 10), "Maria");
        assert_eq!(truncate_text("Maria", 5), "Maria");
    }

    #[test]
    fn truncate_text_cuts_with_ellipsis() {
        assert_eq!(truncate_text("Maria Santos", 6), "Maria…");
    }

    #[test]
    fn truncate_text_handles_multibyte() {
        assert_eq!(truncate_text("João Ângelo", 5), "João…");
    }
}
