//! Keyboard input handling for the vigil TUI.
//!
//! This module provides the event type of the main loop and the key
//! handler that turns key presses into [`App`] operations.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crate::app::App;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use vigil_engine::EngineMessage;

// ============================================================================
// Event Types
// ============================================================================

/// Events that drive the main loop.
#[derive(Debug)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// A snapshot, tick or mutation result from the engine's background work.
    Engine(EngineMessage),
}

// ============================================================================
// Action Types
// ============================================================================

/// What the main loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// While a confirmation prompt is open only `y`, `n`, `Esc` and `Ctrl+C`
/// are accepted; `Esc` then cancels the prompt instead of quitting.
///
/// # Key Bindings
///
/// | Key                  | Action                                   |
/// |----------------------|------------------------------------------|
/// | `q`, `Esc`, `Ctrl+C` | Quit                                     |
/// | `Tab`                | Switch between files and processes       |
/// | `j`, `Down`          | Move cursor down                         |
/// | `k`, `Up`            | Move cursor up                           |
/// | `l`, `Right`, `Enter`| Expand directory, or enter expanded one  |
/// | `h`, `Left`          | Collapse directory / go to parent row    |
/// | `Backspace`          | Re-root at the parent directory          |
/// | `d`                  | Delete file (confirmed) / kill process   |
/// | `y`, `n`             | Answer a confirmation                    |
/// | `b`                  | Toggle bookmark                          |
/// | `'`                  | Jump to next bookmark                    |
/// | `p`                  | Pause/resume process polling             |
/// | `r`                  | Refresh the current view                 |
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    // Windows reports releases too
    if key.kind == KeyEventKind::Release {
        return Action::None;
    }

    // Handle Ctrl+C specially as an unconditional quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }

    if app.confirmation.is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.answer_confirmation(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.answer_confirmation(false)
            }
            _ => {}
        }
        return Action::None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.quit();
            return Action::Quit;
        }

        KeyCode::Tab | KeyCode::BackTab => app.switch_view(),

        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),

        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.enter_selected(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_selected(),
        KeyCode::Backspace => app.navigate_up(),

        KeyCode::Char('d') => app.destroy_selected(),

        KeyCode::Char('b') => app.toggle_bookmark(),
        KeyCode::Char('\'') => app.jump_to_next_bookmark(),

        KeyCode::Char('p') => app.toggle_pause(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh(),

        _ => {}
    }
    Action::None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use vigil_core::{BookmarkSet, MutationAction};
    use vigil_engine::{
        Engine, EngineConfig, SchedulerState, SystemExecutor, SystemSource, ViewKind,
    };

    // Per CLAUDE.md: Tests CAN use .unwrap()

    /// Creates a test KeyEvent with no modifiers.
    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app(dir: &TempDir) -> (App, mpsc::UnboundedReceiver<EngineMessage>) {
        let config = EngineConfig {
            root: dir.path().to_path_buf(),
            poll_interval: Duration::from_secs(3600),
        };
        let (mut engine, rx) = Engine::new(
            config,
            Arc::new(SystemSource::new(true)),
            Arc::new(SystemExecutor),
            BookmarkSet::new(),
        );
        engine.navigate(dir.path().to_path_buf());
        (App::new(engine, ViewKind::Files, None), rx)
    }

    async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<EngineMessage>) {
        while let Ok(Some(message)) = timeout(Duration::from_millis(300), rx.recv()).await {
            app.handle_message(message);
        }
    }

    // ------------------------------------------------------------------------
    // Quit key tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_q_quits() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        let action = handle_key_event(key_event(KeyCode::Char('q')), &mut app);
        assert_eq!(action, Action::Quit);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_escape_quits() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        assert_eq!(handle_key_event(key_event(KeyCode::Esc), &mut app), Action::Quit);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        let action = handle_key_event(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &mut app,
        );
        assert_eq!(action, Action::Quit);
        assert!(app.should_quit);
    }

    // ------------------------------------------------------------------------
    // Navigation key tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_j_and_k_move_cursor() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        let (mut app, mut rx) = test_app(&dir);
        settle(&mut app, &mut rx).await;

        let _ = handle_key_event(key_event(KeyCode::Char('j')), &mut app);
        assert_eq!(app.selected_row().map(|r| r.value("name").to_string()), Some("b".into()));
        let _ = handle_key_event(key_event(KeyCode::Up), &mut app);
        assert_eq!(app.selected_row().map(|r| r.value("name").to_string()), Some("a".into()));
    }

    #[tokio::test]
    async fn test_tab_switches_view() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        let _ = handle_key_event(key_event(KeyCode::Tab), &mut app);
        assert_eq!(app.view, ViewKind::Processes);
        let _ = handle_key_event(key_event(KeyCode::Char('p')), &mut app);
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);
        app.quit();
    }

    // ------------------------------------------------------------------------
    // Confirmation tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_escape_cancels_confirmation_without_quitting() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        let (mut app, mut rx) = test_app(&dir);
        settle(&mut app, &mut rx).await;

        let _ = handle_key_event(key_event(KeyCode::Char('d')), &mut app);
        assert_eq!(
            app.confirmation.as_ref().map(|c| c.action),
            Some(MutationAction::Delete)
        );

        let action = handle_key_event(key_event(KeyCode::Esc), &mut app);
        assert_eq!(action, Action::None);
        assert!(!app.should_quit);
        assert!(app.confirmation.is_none());
        assert!(dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_other_keys_ignored_while_confirming() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        let (mut app, mut rx) = test_app(&dir);
        settle(&mut app, &mut rx).await;

        let _ = handle_key_event(key_event(KeyCode::Char('d')), &mut app);
        let action = handle_key_event(key_event(KeyCode::Char('q')), &mut app);
        assert_eq!(action, Action::None);
        assert!(app.confirmation.is_some());

        let _ = handle_key_event(key_event(KeyCode::Char('y')), &mut app);
        settle(&mut app, &mut rx).await;
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_unhandled_key_does_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        let action = handle_key_event(key_event(KeyCode::Char('z')), &mut app);
        assert_eq!(action, Action::None);
        assert!(!app.should_quit);
    }
}
