//! UI rendering module for the vigil TUI.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: title, view tabs, polling state         |  <- 3 lines
//! +--------------------------------------------------+
//! |  /home/user                                      |
//! |  v src/                                          |
//! |      main.rs  1.2K                               |  <- file tree or
//! |  > target/                                       |     process table
//! |    Cargo.toml  812B                              |
//! +--------------------------------------------------+
//! |  Footer: status message or keybinding hints      |  <- 3 lines
//! +--------------------------------------------------+
//! ```
//!
//! An open confirmation is drawn as a popup on top of everything.

pub mod confirm;
pub mod file_tree;
pub mod layout;
pub mod process_table;
pub mod status_bar;
pub mod theme;

use crate::app::App;
use layout::AppLayout;
use ratatui::Frame;
use vigil_engine::ViewKind;

pub use confirm::render_confirmation;
pub use file_tree::render_file_tree;
pub use process_table::render_process_table;
pub use status_bar::{render_footer, render_header};

/// Renders the complete TUI interface.
///
/// # Example
///
/// ```ignore
/// terminal.draw(|frame| {
///     ui::render(frame, &app);
/// })?;
/// ```
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());
    let engine = app.engine();
    let rows = app.rows();
    let selected = app.selected_index(&rows);

    render_header(
        frame,
        layout.header,
        app.view,
        engine.state(ViewKind::Processes),
        engine.bookmarks().len(),
    );

    match app.view {
        ViewKind::Files => render_file_tree(
            frame,
            layout.body,
            engine.root(),
            &rows,
            selected,
            engine.bookmarks(),
        ),
        ViewKind::Processes => render_process_table(
            frame,
            layout.body,
            &rows,
            selected,
            engine.state(ViewKind::Processes),
        ),
    }

    render_footer(frame, layout.footer, app.view, app.status.as_ref());

    if let Some(confirmation) = &app.confirmation {
        render_confirmation(frame, frame.area(), confirmation);
    }
}
