use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use super::theme::Theme;
use crate::app::{AppState, Mode, TextBuffer};
use crate::dispatch::CallRequest;
use crate::input::keymap;
use crate::lookup;

/// Render the minor-mode hint popup (shown while in column mode).
pub fn render_hint_popup(f: &mut Frame, area: Rect, mode: &Mode) {
    let bindings = keymap::mode_bindings(mode);
    if bindings.is_empty() {
        return;
    }

    let max_key_len = bindings.iter().map(|b| b.key.width()).max().unwrap_or(0);
    let max_desc_len = bindings.iter().map(|b| b.description.width()).max().unwrap_or(0);
    let popup_width = (max_key_len + max_desc_len + 7).min(area.width as usize) as u16;
    let popup_height = (bindings.len() as u16 + 2).min(area.height);

    let x = area.x + area.width.saturating_sub(popup_width);
    let y = area.y + area.height.saturating_sub(popup_height);
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            " colunas ",
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    for (i, binding) in bindings.iter().enumerate() {
        if i >= inner.height as usize {
            break;
        }
        let line = Line::from(vec![
            Span::raw(" "),
            Span::styled(
                format!("{:>width$}", binding.key, width = max_key_len),
                Style::default().fg(Theme::HINT_KEY).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(binding.description, Style::default().fg(Theme::HINT_DESC)),
        ]);
        f.render_widget(
            Paragraph::new(line),
            Rect::new(inner.x, inner.y + i as u16, inner.width, 1),
        );
    }
}

/// Render a generic picker popup over the bottom-right corner.
pub fn render_picker(f: &mut Frame, area: Rect, title: &str, items: &[String], selected: usize) {
    let max_label_len = items.iter().map(|l| l.width()).max().unwrap_or(0);
    let popup_width = ((max_label_len + 6) as u16)
        .max(title.width() as u16 + 4)
        .max(20)
        .min(area.width.saturating_sub(4));
    let popup_height = (items.len() as u16 + 2).min(area.height.saturating_sub(4)).max(3);
    let x = area.x + area.width.saturating_sub(popup_width);
    let y = area.y + area.height.saturating_sub(popup_height);
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    for (i, label) in items.iter().enumerate() {
        if i >= inner.height as usize {
            break;
        }
        let sel_mod = if i == selected {
            Modifier::BOLD | Modifier::REVERSED
        } else {
            Modifier::empty()
        };
        let line = Line::from(vec![
            Span::raw("  "),
            Span::styled(label.clone(), Style::default().fg(Theme::FG).add_modifier(sel_mod)),
        ]);
        f.render_widget(
            Paragraph::new(line),
            Rect::new(inner.x, inner.y + i as u16, inner.width, 1),
        );
    }
}

/// Centered blocking notice. Any key dismisses it.
pub fn render_notice(f: &mut Frame, area: Rect, message: &str) {
    let width = (message.width() as u16 + 6).max(24).min(area.width.saturating_sub(4));
    let panel_area = super::centered_rect(area, 40, 20, width, 5);

    f.render_widget(Clear, panel_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::STATUS_ERROR))
        .title(Span::styled(
            " Aviso ",
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(2, 2, 1, 1));

    let inner = block.inner(panel_area);
    f.render_widget(block, panel_area);

    let lines = vec![
        Line::from(Span::raw(message.to_string())),
        Line::from(""),
        Line::from(Span::styled("Pressione qualquer tecla", Theme::dim_style())),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

/// External links for the selected request: map views of the origin and
/// destination plus a WhatsApp link for the phone.
pub fn render_links(f: &mut Frame, area: Rect, request: &CallRequest) {
    let panel_area = super::centered_rect(area, 70, 60, 50, 16);

    f.render_widget(Clear, panel_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            format!(" {} ", request.patient),
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(2, 2, 1, 1));

    let inner = block.inner(panel_area);
    f.render_widget(block, panel_area);

    let label = Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD);
    let dim = Theme::dim_style();

    let lines = vec![
        Line::from(Span::styled("Mapa (origem)", label)),
        Line::from(Span::styled(lookup::maps_search_url(&request.origin), dim)),
        Line::from(""),
        Line::from(Span::styled("Mapa (destino)", label)),
        Line::from(Span::styled(lookup::maps_search_url(&request.destination), dim)),
        Line::from(""),
        Line::from(Span::styled("Mapa incorporado (destino)", label)),
        Line::from(Span::styled(lookup::maps_embed_url(&request.destination), dim)),
        Line::from(""),
        Line::from(Span::styled("WhatsApp", label)),
        Line::from(Span::styled(lookup::whatsapp_url(&request.phone), dim)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Coordenadas estimadas: ", dim),
            Span::raw(format!("{:.4}, {:.4}", request.coords.lat, request.coords.lng)),
        ]),
        Line::from(""),
        Line::from(Span::styled("Esc fecha", dim)),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

/// Full-screen operator prompt shown before the board.
pub fn render_login(f: &mut Frame, area: Rect, buf: &TextBuffer, state: &AppState) {
    let panel_area = super::centered_rect(area, 40, 25, 40, 8);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            " Despacho ",
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(2, 2, 1, 1));

    let inner = block.inner(panel_area);
    f.render_widget(block, panel_area);

    let mut lines = vec![
        Line::from(Span::raw("Nome do operador de plantão:")),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(buf.input.clone()),
            Span::raw("_"),
        ]),
        Line::from(""),
        Line::from(Span::styled("Enter confirma · Esc sai", Theme::dim_style())),
    ];
    if let Some(notif) = &state.notification {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notif.clone(),
            Style::default().fg(Theme::STATUS_ERROR),
        )));
    }
    f.render_widget(Paragraph::new(lines), inner);
}
