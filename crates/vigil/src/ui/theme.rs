//! Shared theme utilities for the vigil TUI.
//!
//! Provides consistent styling across all UI components.

use ratatui::style::Color;
use vigil_core::RecordKind;
use vigil_engine::SchedulerState;

/// Background of the row under the cursor.
pub const SELECTION_BG: Color = Color::Rgb(30, 30, 40);

/// Foreground color for a tree entry.
pub fn kind_color(kind: RecordKind) -> Color {
    match kind {
        RecordKind::Directory => Color::Blue,
        RecordKind::File => Color::White,
        RecordKind::Process => Color::White,
    }
}

/// Color for a CPU or memory percentage.
///
/// Follows a traffic-light pattern:
/// - Green (< 50%)
/// - Yellow (50-89%)
/// - Red (>= 90%)
pub fn load_color(percentage: f64) -> Color {
    if percentage >= 90.0 {
        Color::Red
    } else if percentage >= 50.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Color for a lowercased process status such as `runnable` or `zombie`.
pub fn process_status_color(status: &str) -> Color {
    match status {
        "runnable" => Color::Green,
        "zombie" | "dead" => Color::Red,
        "stopped" | "tracing" => Color::Yellow,
        _ => Color::DarkGray,
    }
}

/// Color for the scheduler state indicator in the header.
pub fn scheduler_state_color(state: SchedulerState) -> Color {
    match state {
        SchedulerState::Running => Color::Green,
        SchedulerState::Paused => Color::Yellow,
        SchedulerState::Idle => Color::DarkGray,
    }
}
