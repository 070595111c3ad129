//! Confirmation prompt for destructive actions.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{describe, Confirmation};
use crate::ui::layout::centered_rect;

/// Renders a centered yes/no popup over whatever is below it.
pub fn render_confirmation(frame: &mut Frame, area: Rect, confirmation: &Confirmation) {
    let popup = centered_rect(60, 7, area);
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let lines = vec![
        Line::from(format!(
            "{} {}?",
            capitalize(&confirmation.action.to_string()),
            describe(&confirmation.key, confirmation.action)
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", key_style),
            Span::raw(" confirm   "),
            Span::styled("n", key_style),
            Span::raw(" cancel"),
        ]),
    ];

    let prompt = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Confirm ")
                .border_style(Style::default().fg(Color::Red)),
        );

    frame.render_widget(Clear, popup);
    frame.render_widget(prompt, popup);
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
