//! Header and footer status bar widgets for the vigil TUI.
//!
//! The status bar provides:
//! - Header: Application title, view tabs and process polling state
//! - Footer: The latest status message, or keybinding hints

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use vigil_engine::{SchedulerState, ViewKind};

use crate::app::StatusLine;
use crate::ui::theme::scheduler_state_color;

/// Renders the header bar.
///
/// # Arguments
/// * `view` - The view currently on screen, highlighted in the tabs
/// * `polling` - Scheduler state of the process table
/// * `bookmark_count` - Number of bookmarks, shown when non-zero
pub fn render_header(
    frame: &mut Frame,
    area: Rect,
    view: ViewKind,
    polling: SchedulerState,
    bookmark_count: usize,
) {
    let active = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let inactive = Style::default().fg(Color::DarkGray);
    let tab = |kind: ViewKind| {
        let style = if kind == view { active } else { inactive };
        Span::styled(format!(" {kind} "), style)
    };

    let mut spans = vec![
        Span::styled(
            "vigil",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        tab(ViewKind::Files),
        Span::raw(" "),
        tab(ViewKind::Processes),
        Span::raw(" | polling "),
        Span::styled(
            polling.to_string(),
            Style::default().fg(scheduler_state_color(polling)),
        ),
    ];
    if bookmark_count > 0 {
        spans.push(Span::styled(
            format!(
                " | {bookmark_count} bookmark{}",
                if bookmark_count == 1 { "" } else { "s" }
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(header, area);
}

/// Renders the footer: the status message if there is one, otherwise the
/// keybinding hints for `view`.
pub fn render_footer(frame: &mut Frame, area: Rect, view: ViewKind, status: Option<&StatusLine>) {
    let line = match status {
        Some(status) => {
            let color = if status.is_error { Color::Red } else { Color::Green };
            Line::from(Span::styled(
                format!(" {}", status.text),
                Style::default().fg(color),
            ))
        }
        None => Line::from(hints(view)),
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(footer, area);
}

fn hints(view: ViewKind) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let sep_style = Style::default().fg(Color::DarkGray);

    let pairs: &[(&str, &str)] = match view {
        ViewKind::Files => &[
            ("j/k", "move"),
            ("l", "open"),
            ("h", "close"),
            ("Bksp", "up"),
            ("d", "delete"),
            ("b", "mark"),
            ("'", "next mark"),
            ("Tab", "processes"),
            ("q", "quit"),
        ],
        ViewKind::Processes => &[
            ("j/k", "move"),
            ("d", "kill"),
            ("p", "pause"),
            ("r", "refresh"),
            ("Tab", "files"),
            ("q", "quit"),
        ],
    };

    let mut spans = Vec::with_capacity(pairs.len() * 3);
    for (i, (key, label)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", sep_style));
        } else {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(format!(" {label}")));
    }
    spans
}
