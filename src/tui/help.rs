use crate::model::View;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Magenta))
}

/// Key hints for the footer; only shows actions valid on the current view.
pub fn keys_line(view: View, download_enabled: bool, notice_visible: bool) -> Line<'static> {
    let mut spans = Vec::new();
    match view {
        View::Input => {
            spans.extend([key("Enter"), Span::raw(" analyze  ")]);
            spans.extend([key("Backspace"), Span::raw(" delete  ")]);
            spans.extend([key("Ctrl-U"), Span::raw(" clear  ")]);
        }
        View::Loading => {
            spans.push(Span::raw("Analyzing…  "));
        }
        View::Results => {
            if download_enabled {
                spans.extend([key("d"), Span::raw(" download report  ")]);
            }
            spans.extend([key("n"), Span::raw(" new analysis  ")]);
            spans.extend([key("q"), Span::raw(" quit  ")]);
        }
    }
    if notice_visible {
        spans.extend([key("Esc"), Span::raw(" dismiss  ")]);
    }
    spans.extend([key("Ctrl-C"), Span::raw(" quit")]);
    Line::from(spans)
}
