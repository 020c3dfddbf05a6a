use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph};
use ratatui::Frame;

use super::theme::Theme;
use crate::app::{FormField, RequestForm};

/// Centered modal with one line per field. The focused field shows a
/// cursor; validation errors render under the field they belong to.
pub fn render_form(f: &mut Frame, area: Rect, form: &RequestForm) {
    let panel_area = super::centered_rect(area, 60, 80, 54, 20);

    f.render_widget(Clear, panel_area);

    let title = if form.editing.is_some() { " Editar chamado " } else { " Novo chamado " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Theme::FG))
        .title(Span::styled(
            title,
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(2, 2, 1, 1));

    let inner = block.inner(panel_area);
    f.render_widget(block, panel_area);

    let mut lines: Vec<Line> = Vec::new();
    for field in FormField::ALL {
        let focused = form.focus == field;
        let label_style = if focused {
            Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD)
        } else {
            Theme::dim_style()
        };

        let mut spans = vec![
            Span::styled(if focused { "▶ " } else { "  " }, label_style),
            Span::styled(format!("{:<28}", field.label()), label_style),
        ];

        match field {
            FormField::Priority => {
                spans.push(Span::styled(
                    format!("◀ {} ▶", form.priority.label()),
                    Style::default().fg(Theme::priority_color(form.priority)),
                ));
            }
            _ => {
                if let Some(buf) = form.buffer(field) {
                    spans.push(Span::raw(buf.input.clone()));
                    if focused {
                        spans.push(Span::raw("_"));
                    }
                }
            }
        }
        lines.push(Line::from(spans));

        if let Some(message) = form.error_for(field) {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(message, Style::default().fg(Theme::STATUS_ERROR)),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab campo · Espaço/←/→ prioridade · Ctrl-B CEP · Enter salva · Esc cancela",
        Theme::dim_style(),
    )));

    f.render_widget(Paragraph::new(lines), inner);
}
