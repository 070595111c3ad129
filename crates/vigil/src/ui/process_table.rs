//! Process table widget.
//!
//! One row per process, one column per process field, in the order the
//! adapter publishes them.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState},
    Frame,
};
use vigil_engine::{Row, SchedulerState, PROCESS_COLUMNS};

use crate::ui::theme::{load_color, process_status_color, SELECTION_BG};

/// Column headers, parallel to [`PROCESS_COLUMNS`].
const HEADERS: [&str; 8] = ["PID", "NAME", "USER", "CPU%", "MEM%", "STATUS", "THR", "PPID"];

const WIDTHS: [Constraint; 8] = [
    Constraint::Length(8),
    Constraint::Min(16),
    Constraint::Length(10),
    Constraint::Length(6),
    Constraint::Length(6),
    Constraint::Length(9),
    Constraint::Length(4),
    Constraint::Length(8),
];

/// Renders the process table.
///
/// Before the first poll completes the table shows a placeholder instead
/// of an empty grid.
pub fn render_process_table(
    frame: &mut Frame,
    area: Rect,
    rows: &[Row],
    selected: Option<usize>,
    state: SchedulerState,
) {
    let title = format!(" Processes ({}) ", rows.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::White));

    if rows.is_empty() {
        let text = match state {
            SchedulerState::Idle | SchedulerState::Running => "Loading processes...",
            SchedulerState::Paused => "Polling paused (p to resume)",
        };
        let placeholder =
            Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))).block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let header = TableRow::new(HEADERS.iter().map(|h| Cell::from(*h))).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(rows.iter().map(table_row), WIDTHS)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(SELECTION_BG).add_modifier(Modifier::BOLD));

    let mut table_state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn table_row(row: &Row) -> TableRow<'static> {
    let cells = PROCESS_COLUMNS.iter().map(|&column| {
        let value = row.value(column);
        let text = value.to_string();
        let style = match column {
            "cpu_percent" | "memory_percent" => value
                .as_f64()
                .map(|pct| Style::default().fg(load_color(pct)))
                .unwrap_or_default(),
            "status" => Style::default().fg(process_status_color(&text)),
            "pid" => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        Cell::from(text).style(style)
    });
    TableRow::new(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use ratatui::{backend::TestBackend, Terminal};
    use vigil_core::{FieldValue, IdentityKey, RecordKind};

    // Per CLAUDE.md: Tests CAN use .unwrap()

    fn process(pid: u32, name: &str, cpu: &str) -> Row {
        let mut fields = IndexMap::new();
        fields.insert("pid".to_string(), FieldValue::Int(i64::from(pid)));
        fields.insert("name".to_string(), FieldValue::Text(name.to_string()));
        fields.insert("username".to_string(), FieldValue::Empty);
        fields.insert("cpu_percent".to_string(), FieldValue::Text(cpu.to_string()));
        fields.insert("memory_percent".to_string(), FieldValue::Text("0.4".to_string()));
        fields.insert("status".to_string(), FieldValue::Text("sleeping".to_string()));
        Row {
            depth: 0,
            key: IdentityKey::for_pid(pid),
            kind: RecordKind::Process,
            fields,
            expanded: false,
        }
    }

    fn render_to_string(rows: &[Row], state: SchedulerState) -> String {
        let backend = TestBackend::new(100, 10);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render_process_table(frame, frame.area(), rows, Some(0), state))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_headers_match_columns() {
        assert_eq!(HEADERS.len(), PROCESS_COLUMNS.len());
        assert_eq!(WIDTHS.len(), PROCESS_COLUMNS.len());
    }

    #[test]
    fn test_renders_rows() {
        let rows = vec![process(100, "x", "1.5"), process(101, "y", "97.0")];
        let text = render_to_string(&rows, SchedulerState::Running);

        assert!(text.contains("Processes (2)"));
        assert!(text.contains("PID"));
        assert!(text.contains("100"));
        assert!(text.contains("97.0"));
        assert!(text.contains("sleeping"));
    }

    #[test]
    fn test_placeholder_when_paused_and_empty() {
        let text = render_to_string(&[], SchedulerState::Paused);
        assert!(text.contains("Polling paused"));
    }

    #[test]
    fn test_missing_fields_render_blank() {
        let row = process(7, "init", "0.0");
        assert_eq!(row.value("ppid"), &FieldValue::Empty);
        let text = render_to_string(&[row], SchedulerState::Running);
        assert!(text.contains("init"));
    }
}
