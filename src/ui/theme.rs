use ratatui::style::{Color, Style};

use crate::dispatch::layout::Column;
use crate::dispatch::{Priority, Status};

/// Color theme for Despacho.
///
/// Text and chrome use the terminal's default foreground (Color::Reset).
/// Color is reserved for functional signals: priority, status, wait time,
/// and column accents.
pub struct Theme;

impl Theme {
    pub const FG: Color = Color::Reset;
    pub const DIM: Color = Color::DarkGray;

    pub const COLUMN_HEADER: Color = Color::Reset;
    pub const COLUMN_BORDER: Color = Color::Reset;

    pub const CARD_BORDER: Color = Color::Reset;
    pub const CARD_TITLE: Color = Color::Reset;

    pub const PRIORITY_LOW: Color = Color::Green;
    pub const PRIORITY_HIGH: Color = Color::Yellow;
    pub const PRIORITY_URGENT: Color = Color::Red;

    // Wait-time severity in the list view
    pub const WAIT_OK: Color = Color::Green;
    pub const WAIT_WARN: Color = Color::Yellow;
    pub const WAIT_CRITICAL: Color = Color::Red;

    pub const STATUS_ERROR: Color = Color::Red;

    pub const HINT_KEY: Color = Color::Reset;
    pub const HINT_DESC: Color = Color::Reset;

    pub fn dim_style() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn status_style() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn priority_color(priority: Priority) -> Color {
        match priority {
            Priority::Low => Self::PRIORITY_LOW,
            Priority::Medium => Self::FG,
            Priority::High => Self::PRIORITY_HIGH,
            Priority::Urgent => Self::PRIORITY_URGENT,
        }
    }

    pub fn status_color(status: Status) -> Color {
        match status {
            Status::Triage => Color::Red,
            Status::Allocated => Color::Blue,
            Status::EnRoute => Color::Magenta,
            Status::Completed => Color::Green,
            Status::Cancelled => Self::DIM,
        }
    }

    /// Wait-time color: green under 15 minutes, yellow under 30, red after.
    pub fn wait_color(minutes: i64) -> Color {
        if minutes < 15 {
            Self::WAIT_OK
        } else if minutes < 30 {
            Self::WAIT_WARN
        } else {
            Self::WAIT_CRITICAL
        }
    }

    /// Map a persisted color tag to a terminal color. Unknown tags fall
    /// back to the default foreground.
    pub fn color_tag(tag: &str) -> Color {
        match tag {
            "red" => Color::Red,
            "blue" => Color::Blue,
            "purple" => Color::Magenta,
            "green" => Color::Green,
            "gray" => Color::DarkGray,
            "yellow" => Color::Yellow,
            "orange" => Color::LightRed,
            "pink" => Color::LightMagenta,
            _ => Self::FG,
        }
    }

    /// Accent color of a column: its persisted tag when present, otherwise
    /// the fixed-status color, otherwise the default foreground.
    pub fn column_color(column: &Column) -> Color {
        match column.color.as_deref() {
            Some(tag) => Self::color_tag(tag),
            None => match column.id.status() {
                Some(status) => Self::status_color(status),
                None => Self::FG,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::layout::Layout;

    #[test]
    fn unknown_color_tag_falls_back_to_fg() {
        assert_eq!(Theme::color_tag("chartreuse"), Theme::FG);
        assert_eq!(Theme::color_tag("red"), Color::Red);
    }

    #[test]
    fn column_color_prefers_persisted_tag() {
        let mut layout = Layout::default();
        let id = layout.columns()[0].id.clone();
        assert_eq!(Theme::column_color(&layout.columns()[0]), Color::Red);
        layout.set_color(&id, Some("yellow".into()));
        assert_eq!(Theme::column_color(&layout.columns()[0]), Color::Yellow);
    }

    #[test]
    fn wait_color_thresholds() {
        assert_eq!(Theme::wait_color(0), Theme::WAIT_OK);
        assert_eq!(Theme::wait_color(14), Theme::WAIT_OK);
        assert_eq!(Theme::wait_color(15), Theme::WAIT_WARN);
        assert_eq!(Theme::wait_color(29), Theme::WAIT_WARN);
        assert_eq!(Theme::wait_color(30), Theme::WAIT_CRITICAL);
    }
}
