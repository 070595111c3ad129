//! Application state for the vigil TUI.
//!
//! [`App`] wraps the [`Engine`] and adds what only the front end cares
//! about: which view is shown, the status line, the open confirmation
//! prompt and the quit flag.
//!
//! The cursor lives in the engine as an identity. The app additionally
//! remembers the last row index per view, so that when the row under the
//! cursor disappears the cursor lands on its neighbour instead of jumping
//! to the top.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use vigil_core::{BookmarkStore, IdentityKey, MutationAction, RecordKind};
use vigil_engine::{Engine, EngineMessage, Row, SchedulerState, ViewEvent, ViewKind};

use crate::bookmarks::JsonBookmarkStore;

// ============================================================================
// Status Line
// ============================================================================

/// A one-line message shown in the footer until replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A destructive action waiting for a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub key: IdentityKey,
    pub action: MutationAction,
}

// ============================================================================
// Application
// ============================================================================

pub struct App {
    engine: Engine,
    events: broadcast::Receiver<ViewEvent>,

    /// The view currently on screen.
    pub view: ViewKind,

    /// Last known row index of the cursor, per view.
    index_hints: HashMap<ViewKind, usize>,

    pub status: Option<StatusLine>,

    pub confirmation: Option<Confirmation>,

    /// Process polling was paused with `p`; showing the table does not
    /// resume it.
    polling_held: bool,

    bookmark_store: Option<JsonBookmarkStore>,

    /// Flag indicating the application should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates the app on top of `engine`, showing `view` first.
    pub fn new(engine: Engine, view: ViewKind, bookmark_store: Option<JsonBookmarkStore>) -> Self {
        let events = engine.subscribe();
        let mut app = Self {
            engine,
            events,
            view: ViewKind::Files,
            index_hints: HashMap::new(),
            status: None,
            confirmation: None,
            polling_held: false,
            bookmark_store,
            should_quit: false,
        };
        if view != app.view {
            app.switch_view();
        }
        app
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Feeds a message from background work to the engine and applies the
    /// resulting notifications.
    pub fn handle_message(&mut self, message: EngineMessage) {
        self.engine.handle(message);
        self.drain_events();
    }

    /// Applies every queued view event, then re-anchors the cursor.
    pub fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.on_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "View event receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.sync_cursor();
    }

    fn on_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::Changed { .. } => {}
            ViewEvent::ShowConfirmation { key, action } => {
                debug!(key = %key, action = %action, "Confirmation requested");
                self.confirmation = Some(Confirmation { key, action });
            }
            ViewEvent::Completed {
                key,
                action,
                already_gone,
            } => {
                let what = describe(&key, action);
                let text = match (action, already_gone) {
                    (_, true) => format!("{what} was already gone"),
                    (MutationAction::Delete, false) => format!("Deleted {what}"),
                    (MutationAction::Kill, false) => format!("Killed {what}"),
                };
                self.status = Some(StatusLine::info(text));
            }
            ViewEvent::Error { kind, message } => {
                debug!(kind = %kind, "Engine reported error");
                self.status = Some(StatusLine::error(message));
            }
        }
    }

    // ------------------------------------------------------------------------
    // Rows and cursor
    // ------------------------------------------------------------------------

    /// Rows of the current view, in display order.
    pub fn rows(&self) -> Vec<Row> {
        self.engine.rows(self.view)
    }

    /// Index of the cursor row in `rows`.
    ///
    /// Falls back to the last known index (clamped) when the identity under
    /// the cursor is gone.
    pub fn selected_index(&self, rows: &[Row]) -> Option<usize> {
        if rows.is_empty() {
            return None;
        }
        let by_key = self
            .engine
            .cursor(self.view)
            .and_then(|key| rows.iter().position(|row| &row.key == key));
        let hint = self.index_hints.get(&self.view).copied().unwrap_or(0);
        Some(by_key.unwrap_or_else(|| hint.min(rows.len().saturating_sub(1))))
    }

    /// The row under the cursor, if any.
    pub fn selected_row(&self) -> Option<Row> {
        let rows = self.rows();
        let index = self.selected_index(&rows)?;
        rows.into_iter().nth(index)
    }

    fn select_index(&mut self, rows: &[Row], index: usize) {
        if let Some(row) = rows.get(index) {
            self.index_hints.insert(self.view, index);
            self.engine.select_cursor(self.view, row.key.clone());
        }
    }

    /// Points the engine cursor at a row that exists.
    fn sync_cursor(&mut self) {
        let rows = self.rows();
        if let Some(index) = self.selected_index(&rows) {
            self.select_index(&rows, index);
        }
    }

    /// Moves the cursor down, wrapping around.
    pub fn select_next(&mut self) {
        let rows = self.rows();
        if let Some(index) = self.selected_index(&rows) {
            self.select_index(&rows, index.saturating_add(1) % rows.len());
        }
    }

    /// Moves the cursor up, wrapping around.
    pub fn select_previous(&mut self) {
        let rows = self.rows();
        if let Some(index) = self.selected_index(&rows) {
            let previous = if index == 0 {
                rows.len().saturating_sub(1)
            } else {
                index.saturating_sub(1)
            };
            self.select_index(&rows, previous);
        }
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Shows the other view.
    ///
    /// The process table only polls while it is on screen. Showing it
    /// refreshes it at once unless polling was paused with `p`.
    pub fn switch_view(&mut self) {
        let hidden = self.view;
        self.view = self.view.toggled();
        if hidden == ViewKind::Processes
            && self.engine.state(ViewKind::Processes) == SchedulerState::Running
        {
            self.engine.pause(ViewKind::Processes);
        }
        if self.view == ViewKind::Processes && !self.polling_held {
            self.engine.resume(ViewKind::Processes);
        }
        info!(view = %self.view, "Switched view");
        self.sync_cursor();
    }

    /// Pauses or resumes process table polling.
    ///
    /// The pause survives view switches. Resuming while the table is
    /// hidden only clears the pause; polling restarts when it is shown.
    pub fn toggle_pause(&mut self) {
        let view = ViewKind::Processes;
        self.polling_held = !self.polling_held;
        if self.polling_held {
            self.engine.pause(view);
            self.status = Some(StatusLine::info("Process polling paused"));
        } else {
            if self.view == view {
                self.engine.resume(view);
            }
            self.status = Some(StatusLine::info("Process polling resumed"));
        }
    }

    pub fn refresh(&mut self) {
        if !self.engine.refresh(self.view) {
            self.status = Some(StatusLine::info(format!("{} view is paused", self.view)));
        }
    }

    // ------------------------------------------------------------------------
    // Tree navigation
    // ------------------------------------------------------------------------

    /// Expands the directory under the cursor, or re-roots into it when it
    /// is already expanded.
    pub fn enter_selected(&mut self) {
        if self.view != ViewKind::Files {
            return;
        }
        let Some(row) = self.selected_row() else {
            return;
        };
        if let Err(e) = self.engine.enter(&row.key) {
            self.status = Some(StatusLine::error(e.to_string()));
        }
        self.drain_events();
    }

    /// Collapses the directory under the cursor, or moves the cursor to the
    /// enclosing directory.
    pub fn collapse_selected(&mut self) {
        if self.view != ViewKind::Files {
            return;
        }
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.expanded && self.engine.collapse(&row.key) {
            return;
        }
        if row.depth > 0 {
            if let Some(parent) = row.key.as_path().parent() {
                let parent = IdentityKey::for_path(parent);
                self.engine.select_cursor(ViewKind::Files, parent);
            }
        }
    }

    /// Re-roots the tree at the parent of the current root.
    pub fn navigate_up(&mut self) {
        if self.view != ViewKind::Files {
            return;
        }
        if !self.engine.navigate_up() {
            self.status = Some(StatusLine::info("Already at the filesystem root"));
        }
    }

    pub fn navigate(&mut self, path: PathBuf) {
        self.engine.navigate(path);
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Deletes (files view, after confirmation) or kills (process view)
    /// whatever is under the cursor.
    pub fn destroy_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let result = match self.view {
            ViewKind::Files => self.engine.request_delete(row.key),
            ViewKind::Processes => self.engine.request_kill(row.key),
        };
        if let Err(e) = result {
            self.status = Some(StatusLine::error(e.to_string()));
        }
        self.drain_events();
    }

    /// Answers the open confirmation prompt.
    pub fn answer_confirmation(&mut self, accept: bool) {
        let Some(confirmation) = self.confirmation.take() else {
            return;
        };
        if let Err(e) = self.engine.confirm_mutation(&confirmation.key, accept) {
            self.status = Some(StatusLine::error(e.to_string()));
        } else if !accept {
            self.status = Some(StatusLine::info("Cancelled"));
        }
        self.drain_events();
    }

    // ------------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------------

    /// Bookmarks the directory under the cursor, or the root when the
    /// cursor is on a file, and persists the set.
    pub fn toggle_bookmark(&mut self) {
        if self.view != ViewKind::Files {
            return;
        }
        let path = match self.selected_row() {
            Some(row) if row.kind == RecordKind::Directory => row.key.as_path().to_path_buf(),
            _ => self.engine.root().to_path_buf(),
        };

        let added = self.engine.toggle_bookmark(&path);
        let verb = if added { "Bookmarked" } else { "Removed bookmark" };
        self.status = Some(StatusLine::info(format!("{verb} {}", path.display())));

        if let Some(store) = &self.bookmark_store {
            if let Err(e) = store.save(self.engine.bookmarks()) {
                warn!(error = %e, "Failed to save bookmarks");
                self.status = Some(StatusLine::error(e.to_string()));
            }
        }
    }

    pub fn jump_to_next_bookmark(&mut self) {
        match self.engine.jump_to_next_bookmark() {
            Some(path) => {
                self.view = ViewKind::Files;
                self.status = Some(StatusLine::info(format!("Jumped to {}", path.display())));
            }
            None => self.status = Some(StatusLine::info("No bookmarks")),
        }
    }

    /// Sets the quit flag and stops background polling.
    pub fn quit(&mut self) {
        self.should_quit = true;
        self.engine.shutdown();
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("view", &self.view)
            .field("status", &self.status)
            .field("confirmation", &self.confirmation)
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

/// Short human name for the target of a mutation.
pub fn describe(key: &IdentityKey, action: MutationAction) -> String {
    match action {
        MutationAction::Delete => key.as_path().display().to_string(),
        MutationAction::Kill => format!("process {key}"),
    }
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
    use vigil_core::{BookmarkSet, ResourceId};
    use vigil_engine::{EngineConfig, SystemExecutor, SystemSource};

    // Per CLAUDE.md: Tests CAN use .unwrap()

    fn app_at(
        dir: &TempDir,
        store: Option<JsonBookmarkStore>,
    ) -> (App, mpsc::UnboundedReceiver<EngineMessage>) {
        app_polling_every(dir, store, Duration::from_secs(3600))
    }

    fn app_polling_every(
        dir: &TempDir,
        store: Option<JsonBookmarkStore>,
        poll_interval: Duration,
    ) -> (App, mpsc::UnboundedReceiver<EngineMessage>) {
        let config = EngineConfig {
            root: dir.path().to_path_buf(),
            poll_interval,
        };
        let (mut engine, rx) = Engine::new(
            config,
            Arc::new(SystemSource::new(true)),
            Arc::new(SystemExecutor),
            BookmarkSet::new(),
        );
        engine.navigate(dir.path().to_path_buf());
        (App::new(engine, ViewKind::Files, store), rx)
    }

    async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<EngineMessage>) {
        while let Ok(Some(message)) = timeout(Duration::from_millis(300), rx.recv()).await {
            app.handle_message(message);
        }
    }

    /// Feeds messages to the app until a process table snapshot arrives.
    async fn await_process_poll(app: &mut App, rx: &mut mpsc::UnboundedReceiver<EngineMessage>) {
        loop {
            let message = timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let polled = matches!(
                &message,
                EngineMessage::Acquired(acquisition) if acquisition.resource == ResourceId::Processes
            );
            app.handle_message(message);
            if polled {
                return;
            }
        }
    }

    fn populated() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("inner.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        dir
    }

    fn selected_name(app: &App) -> String {
        app.selected_row()
            .map(|row| row.value("name").to_string())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_cursor_starts_on_first_row() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        assert_eq!(selected_name(&app), "sub");
        assert_eq!(
            app.engine().cursor(ViewKind::Files),
            Some(&IdentityKey::for_path(&dir.path().join("sub")))
        );
    }

    #[tokio::test]
    async fn test_selection_wraps() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        app.select_previous();
        assert_eq!(selected_name(&app), "b.txt");
        app.select_next();
        assert_eq!(selected_name(&app), "sub");
    }

    #[tokio::test]
    async fn test_cursor_follows_identity_across_inserts() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        app.select_next();
        assert_eq!(selected_name(&app), "a.txt");

        fs::write(dir.path().join("0-first.txt"), "").unwrap();
        app.refresh();
        settle(&mut app, &mut rx).await;

        assert_eq!(selected_name(&app), "a.txt");
    }

    #[tokio::test]
    async fn test_cursor_falls_to_neighbour_when_row_vanishes() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        app.select_next();
        fs::remove_file(dir.path().join("a.txt")).unwrap();
        app.refresh();
        settle(&mut app, &mut rx).await;

        assert_eq!(selected_name(&app), "b.txt");
    }

    #[tokio::test]
    async fn test_enter_expands_then_collapse() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        app.enter_selected();
        settle(&mut app, &mut rx).await;
        assert_eq!(app.rows().len(), 4);

        app.select_next();
        assert_eq!(selected_name(&app), "inner.txt");
        app.collapse_selected();
        assert_eq!(selected_name(&app), "sub");
        app.collapse_selected();
        assert_eq!(app.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;
        app.select_next();

        app.destroy_selected();
        assert_eq!(
            app.confirmation.as_ref().map(|c| c.action),
            Some(MutationAction::Delete)
        );
        assert!(dir.path().join("a.txt").exists());

        app.answer_confirmation(false);
        assert!(app.confirmation.is_none());
        assert_eq!(app.status, Some(StatusLine::info("Cancelled")));
        assert!(dir.path().join("a.txt").exists());

        app.destroy_selected();
        app.answer_confirmation(true);
        settle(&mut app, &mut rx).await;

        assert!(!dir.path().join("a.txt").exists());
        assert!(app.status.as_ref().map(|s| s.text.starts_with("Deleted")).unwrap_or(false));
        assert_eq!(selected_name(&app), "b.txt");
    }

    #[tokio::test]
    async fn test_bookmark_toggle_persists() {
        let dir = populated();
        let state = TempDir::new().unwrap();
        let store = JsonBookmarkStore::new(state.path().join("bookmarks.json"));
        let (mut app, mut rx) = app_at(&dir, Some(store.clone()));
        settle(&mut app, &mut rx).await;

        app.toggle_bookmark();
        let saved = store.load().unwrap();
        assert!(saved.contains(&dir.path().join("sub")));

        app.toggle_bookmark();
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch_view_starts_process_polling() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Idle);

        app.switch_view();
        assert_eq!(app.view, ViewKind::Processes);
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Running);
        settle(&mut app, &mut rx).await;
        assert!(!app.rows().is_empty());

        app.toggle_pause();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);
        app.switch_view();
        app.switch_view();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);
        app.quit();
    }

    #[tokio::test]
    async fn test_hidden_process_table_stops_polling() {
        let dir = populated();
        let (mut app, mut rx) = app_polling_every(&dir, None, Duration::from_millis(100));
        settle(&mut app, &mut rx).await;

        app.switch_view();
        await_process_poll(&mut app, &mut rx).await;

        app.switch_view();
        assert_eq!(app.view, ViewKind::Files);
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);
        // Anything already queued was sent while the table was visible
        while let Ok(message) = rx.try_recv() {
            app.handle_message(message);
        }

        let mut ticks = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(600);
        while let Ok(Some(message)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            if matches!(message, EngineMessage::Tick(ViewKind::Processes)) {
                ticks += 1;
            }
            app.handle_message(message);
        }
        assert_eq!(ticks, 0);

        // Showing the table again refreshes it without waiting for a tick
        app.switch_view();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Running);
        await_process_poll(&mut app, &mut rx).await;
        app.quit();
    }

    #[tokio::test]
    async fn test_pause_key_survives_hiding_and_showing() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        // Paused from the files view: showing the table does not start it
        app.toggle_pause();
        app.switch_view();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);

        app.toggle_pause();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Running);

        // Unpausing while hidden waits until the table is shown
        app.switch_view();
        app.toggle_pause();
        app.toggle_pause();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Paused);
        app.switch_view();
        assert_eq!(app.engine().state(ViewKind::Processes), SchedulerState::Running);
        app.quit();
    }

    #[tokio::test]
    async fn test_unreadable_directory_sets_error_status() {
        let dir = populated();
        let (mut app, mut rx) = app_at(&dir, None);
        settle(&mut app, &mut rx).await;

        app.navigate(dir.path().join("missing"));
        settle(&mut app, &mut rx).await;

        assert!(app.status.as_ref().map(|s| s.is_error).unwrap_or(false));
        assert_eq!(app.engine().root(), dir.path());
    }
}
