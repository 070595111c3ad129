//! Directory tree widget.
//!
//! Rows come pre-flattened from the engine (depth-first, with depth); this
//! widget only indents and decorates them.

use std::path::Path;

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use vigil_core::{BookmarkSet, FieldValue, RecordKind};
use vigil_engine::Row;

use crate::ui::theme::{kind_color, SELECTION_BG};

/// Renders the directory tree rooted at `root`.
pub fn render_file_tree(
    frame: &mut Frame,
    area: Rect,
    root: &Path,
    rows: &[Row],
    selected: Option<usize>,
    bookmarks: &BookmarkSet,
) {
    let marker = if bookmarks.contains(root) { " *" } else { "" };
    let title = format!(" {}{marker} ", root.display());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::White));

    if rows.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "(empty)",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| tree_item(row, bookmarks.contains(row.key.as_path())))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(SELECTION_BG).add_modifier(Modifier::BOLD))
        .highlight_symbol(">");

    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn tree_item(row: &Row, bookmarked: bool) -> ListItem<'static> {
    let indent = "  ".repeat(row.depth);
    let (arrow, suffix) = match row.kind {
        RecordKind::Directory if row.expanded => ("v ", "/"),
        RecordKind::Directory => ("> ", "/"),
        _ => ("  ", ""),
    };

    let mut spans = vec![
        Span::raw(indent),
        Span::styled(arrow, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}{suffix}", row.value("name")),
            Style::default().fg(kind_color(row.kind)),
        ),
    ];
    if let FieldValue::Int(bytes) = row.value("size") {
        spans.push(Span::styled(
            format!("  {}", format_size(*bytes)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if bookmarked {
        spans.push(Span::styled(" *", Style::default().fg(Color::Yellow)));
    }

    ListItem::new(Line::from(spans))
}

/// Formats a byte count with a binary unit, one decimal above bytes.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1}{unit}")
}
