//! Layout helpers for the vigil TUI.
//!
//! Provides the main application layout and popup positioning.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout areas.
///
/// The TUI is divided into three vertical sections:
/// - Header (3 lines): Title, view tabs and scheduler state
/// - Body (fills remaining): The file tree or the process table
/// - Footer (3 lines): Status message or keybinding help
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub body: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let [header, body, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Body
                Constraint::Length(3), // Footer
            ])
            .areas(area);

        Self {
            header,
            body,
            footer,
        }
    }
}

/// A rectangle of `height` lines and `percent_x` of the width, centered in
/// `area` and clamped to it.
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect::new(
        area.x.saturating_add(area.width.saturating_sub(width) / 2),
        area.y.saturating_add(area.height.saturating_sub(height) / 2),
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_layout_creation() {
        let area = Rect::new(0, 0, 80, 24);
        let layout = AppLayout::new(area);

        // Header should be 3 lines at top
        assert_eq!(layout.header.y, 0);
        assert_eq!(layout.header.height, 3);

        // Footer should be 3 lines at bottom
        assert_eq!(layout.footer.height, 3);
        assert_eq!(layout.footer.y + layout.footer.height, 24);

        // Body takes the rest at full width
        assert_eq!(layout.body.y, 3);
        assert_eq!(layout.body.height, 18);
        assert_eq!(layout.body.width, 80);
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 20);
        let popup = centered_rect(50, 5, area);
        assert_eq!(popup.width, 50);
        assert_eq!(popup.height, 5);
        assert_eq!(popup.x, 25);
        assert_eq!(popup.y, 7);
    }

    #[test]
    fn test_centered_rect_clamps_to_small_area() {
        let area = Rect::new(0, 0, 10, 3);
        let popup = centered_rect(50, 5, area);
        assert_eq!(popup.height, 3);
        assert_eq!(popup.y, 0);
    }
}
