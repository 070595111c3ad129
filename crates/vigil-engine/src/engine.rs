//! The foreground owner.
//!
//! [`Engine`] is the single writer of every view registry. The host calls
//! its operations directly and feeds it every [`EngineMessage`] received
//! from the channel returned by [`Engine::new`]. Nothing in here blocks:
//! acquisitions and side effects are dispatched and come back later as
//! messages.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Event publish failures (no subscribers) are ignored

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::{
    BookmarkSet, IdentityKey, MutationAction, PendingMutation, ReconcileError, ResourceId,
    Snapshot,
};

use crate::adapter::SnapshotSource;
use crate::cache::{ResourceCache, Row};
use crate::error::{EngineError, EngineResult};
use crate::events::{Acquisition, EngineMessage, MutationOutcome, ViewChange, ViewEvent, ViewKind};
use crate::gateway::{MutationExecutor, MutationGateway, Resolution};
use crate::registry::ViewHandle;
use crate::scheduler::{Scheduler, SchedulerState, DEFAULT_POLL_INTERVAL};
use crate::tree::DirectoryTree;

/// Capacity of the view event broadcast channel.
const EVENT_BUFFER: usize = 1024;

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the directory tree.
    pub root: PathBuf,
    /// Period of the process table refresh.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Owns the directory tree, the process table, the scheduler and the
/// mutation gateway.
pub struct Engine {
    tree: DirectoryTree,
    /// Where to fall back to if the current root cannot be read.
    previous_root: Option<PathBuf>,
    processes: ResourceCache,
    scheduler: Scheduler,
    gateway: MutationGateway,
    bookmarks: BookmarkSet,
    cursors: HashMap<ViewKind, IdentityKey>,
    event_publisher: broadcast::Sender<ViewEvent>,
    cancel: CancellationToken,
}

impl Engine {
    /// Creates an engine and the receiver its background work reports to.
    ///
    /// Nothing is acquired until the host calls [`navigate`](Self::navigate)
    /// or [`resume`](Self::resume).
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn SnapshotSource>,
        executor: Arc<dyn MutationExecutor>,
        bookmarks: BookmarkSet,
    ) -> (Self, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let engine = Self {
            tree: DirectoryTree::new(config.root),
            previous_root: None,
            processes: ResourceCache::new(ResourceId::Processes),
            scheduler: Scheduler::new(source, tx.clone(), config.poll_interval, cancel.clone()),
            gateway: MutationGateway::new(executor, tx),
            bookmarks,
            cursors: HashMap::new(),
            event_publisher: event_tx,
            cancel,
        };
        (engine, rx)
    }

    /// Subscribes to view events.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.event_publisher.subscribe()
    }

    /// Stops the periodic ticker. In-flight work still reports back.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn state(&self, view: ViewKind) -> SchedulerState {
        self.scheduler.state(view)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Re-roots the directory tree at `path` and acquires it.
    ///
    /// If the new root cannot be read, the engine falls back to the
    /// previous root once the failure arrives. Navigating to the current
    /// root keeps every cache and handle and only re-acquires the visible
    /// directories.
    pub fn navigate(&mut self, path: PathBuf) {
        if path == self.tree.root() {
            debug!(path = %path.display(), "Already at root, re-acquiring");
            self.reacquire_tree();
            return;
        }
        info!(path = %path.display(), "Navigating");
        let old = self.tree.set_root(path.clone());
        self.previous_root = Some(old);
        self.cursors.remove(&ViewKind::Files);
        self.scheduler.acquire(ResourceId::Directory(path));
    }

    /// Navigates to the parent of the current root, keeping the cursor on
    /// the directory just left. Returns `false` at the filesystem root.
    pub fn navigate_up(&mut self) -> bool {
        let current = self.tree.root().to_path_buf();
        let Some(parent) = current.parent().map(Path::to_path_buf) else {
            return false;
        };
        self.navigate(parent);
        self.cursors
            .insert(ViewKind::Files, IdentityKey::for_path(&current));
        true
    }

    /// Expands the directory named by `key` and acquires its children.
    ///
    /// Expanding a file is a no-op.
    pub fn expand(&mut self, key: &IdentityKey) -> EngineResult<()> {
        let handle = self
            .tree
            .lookup(key)
            .ok_or_else(|| EngineError::UnknownIdentity(key.clone()))?;
        if !handle.kind().is_directory() {
            return Ok(());
        }
        let resource = self.tree.expand(key.as_path());
        self.scheduler.acquire(resource);
        Ok(())
    }

    /// Collapses the directory named by `key`. Its cache is kept.
    pub fn collapse(&mut self, key: &IdentityKey) -> bool {
        self.tree.collapse(key.as_path())
    }

    /// Expands a collapsed directory or collapses an expanded one.
    pub fn toggle(&mut self, key: &IdentityKey) -> EngineResult<()> {
        if self.tree.is_expanded(key.as_path()) {
            self.collapse(key);
            Ok(())
        } else {
            self.expand(key)
        }
    }

    /// Expands a collapsed directory, or makes an expanded one the root.
    pub fn enter(&mut self, key: &IdentityKey) -> EngineResult<()> {
        if self.tree.is_expanded(key.as_path()) {
            self.navigate(key.as_path().to_path_buf());
            Ok(())
        } else {
            self.expand(key)
        }
    }

    /// Moves the cursor of `view` to `key`.
    ///
    /// Returns `false` (and leaves the cursor alone) when `key` is not in
    /// the view.
    pub fn select_cursor(&mut self, view: ViewKind, key: IdentityKey) -> bool {
        if self.lookup(view, &key).is_none() {
            return false;
        }
        self.cursors.insert(view, key);
        true
    }

    /// The identity under the cursor of `view`, if any.
    ///
    /// The identity may have been removed since it was selected; resolve
    /// it with [`lookup`](Self::lookup) before acting on it.
    pub fn cursor(&self, view: ViewKind) -> Option<&IdentityKey> {
        self.cursors.get(&view)
    }

    /// Resolves `key` in `view` at the moment of the call.
    pub fn lookup(&self, view: ViewKind, key: &IdentityKey) -> Option<&ViewHandle> {
        match view {
            ViewKind::Files => self.tree.lookup(key),
            ViewKind::Processes => self.processes.lookup(key),
        }
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Re-acquires every visible resource of `view`.
    ///
    /// Does nothing while `view` is paused or was never started. Returns
    /// `true` if anything was dispatched.
    pub fn refresh(&mut self, view: ViewKind) -> bool {
        if !self.scheduler.should_poll(view) {
            debug!(view = %view, state = %self.scheduler.state(view), "Skipping refresh");
            return false;
        }
        match view {
            ViewKind::Files => self.reacquire_tree(),
            ViewKind::Processes => {
                self.scheduler.acquire(ResourceId::Processes);
            }
        }
        true
    }

    fn reacquire_tree(&mut self) {
        for dir in self.tree.visible_directories() {
            self.scheduler.acquire(ResourceId::Directory(dir));
        }
    }

    pub fn pause(&mut self, view: ViewKind) {
        self.scheduler.pause(view);
    }

    /// Resumes `view`, refreshing it immediately if it was not running.
    pub fn resume(&mut self, view: ViewKind) {
        if self.scheduler.resume(view) {
            self.refresh(view);
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn pending_mutation(&self) -> Option<&PendingMutation> {
        self.gateway.pending()
    }

    /// Asks to delete the entry named by `key`.
    ///
    /// Publishes [`ViewEvent::ShowConfirmation`]; nothing is deleted until
    /// [`confirm_mutation`](Self::confirm_mutation) accepts. An entry that
    /// is no longer in the tree completes immediately as already gone.
    pub fn request_delete(&mut self, key: IdentityKey) -> EngineResult<()> {
        if self.tree.lookup(&key).is_none() {
            self.publish(ViewEvent::Completed {
                key,
                action: MutationAction::Delete,
                already_gone: true,
            });
            return Ok(());
        }

        self.gateway
            .request_delete(key.clone())
            .map_err(|e| self.report(e))?;
        self.publish(ViewEvent::ShowConfirmation {
            key,
            action: MutationAction::Delete,
        });
        Ok(())
    }

    /// Answers the confirmation for `key`, committing the delete if
    /// `accept` is set.
    pub fn confirm_mutation(&mut self, key: &IdentityKey, accept: bool) -> EngineResult<()> {
        let committing = self
            .gateway
            .confirm(key, accept)
            .map_err(|e| self.report(e))?;
        match committing {
            Some(mutation) => self.gateway.commit(&mutation).map_err(|e| self.report(e)),
            None => Ok(()),
        }
    }

    /// Terminates the process named by `key`, without confirmation.
    ///
    /// A process no longer in the table resolves as already gone without
    /// sending any signal, since its pid may have been reused.
    pub fn request_kill(&mut self, key: IdentityKey) -> EngineResult<()> {
        let mutation = self
            .gateway
            .begin_kill(key.clone())
            .map_err(|e| self.report(e))?;

        if self.processes.lookup(&key).is_none() {
            debug!(key = %key, "Kill target already left the process table");
            self.finish_mutation(MutationOutcome {
                result: Err(ReconcileError::AlreadyGone(key.to_string())),
                key,
                action: MutationAction::Kill,
            });
            return Ok(());
        }

        self.gateway.commit(&mutation).map_err(|e| self.report(e))
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Handles one message from background work.
    pub fn handle(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Tick(view) => {
                self.refresh(view);
            }
            EngineMessage::Acquired(acquisition) => self.apply_acquisition(acquisition),
            EngineMessage::MutationFinished(outcome) => self.finish_mutation(outcome),
        }
    }

    fn apply_acquisition(&mut self, acquisition: Acquisition) {
        let Acquisition {
            resource,
            seq,
            result,
        } = acquisition;

        match (resource, result) {
            (ResourceId::Processes, Ok(snapshot)) => {
                if let Some(changes) = self.processes.apply(seq, Arc::new(snapshot)) {
                    self.publish_changes(ViewKind::Processes, &ResourceId::Processes, seq, changes);
                }
            }
            (ResourceId::Processes, Err(e)) => {
                if self.processes.accept(seq) {
                    warn!(error = %e, seq, "Process table acquisition failed");
                    self.report(EngineError::Reconcile(e));
                }
            }
            (ResourceId::Directory(dir), Ok(snapshot)) => {
                self.apply_directory(dir, seq, snapshot);
            }
            (ResourceId::Directory(dir), Err(e)) => {
                if self.tree.accept_failure(&dir, seq) {
                    self.directory_failed(dir, e);
                }
            }
        }
    }

    fn apply_directory(&mut self, dir: PathBuf, seq: u64, snapshot: Snapshot) {
        if let Some(changes) = self.tree.apply(&dir, seq, Arc::new(snapshot)) {
            if dir == self.tree.root() {
                // The root is readable; it is the new fallback
                self.previous_root = None;
            }
            self.publish_changes(ViewKind::Files, &ResourceId::Directory(dir), seq, changes);
        }
    }

    /// Falls back after a directory could not be read.
    ///
    /// An unreadable root reverts to the previous root, or to its parent;
    /// an unreadable subdirectory is collapsed, or pruned if it is gone.
    fn directory_failed(&mut self, dir: PathBuf, err: ReconcileError) {
        warn!(dir = %dir.display(), error = %err, "Directory acquisition failed");

        if dir == self.tree.root() {
            let fallback = self
                .previous_root
                .take()
                .filter(|prev| prev != &dir)
                .or_else(|| dir.parent().map(Path::to_path_buf));
            if let Some(fallback) = fallback {
                info!(from = %dir.display(), to = %fallback.display(), "Reverting navigation");
                self.tree.set_root(fallback.clone());
                self.scheduler.acquire(ResourceId::Directory(fallback));
            }
        } else if matches!(err, ReconcileError::NotFound(_)) {
            self.tree.prune(&dir);
        } else {
            self.tree.collapse(&dir);
        }

        self.report(EngineError::Reconcile(err));
    }

    fn finish_mutation(&mut self, outcome: MutationOutcome) {
        let resolution = match self.gateway.finish(&outcome) {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, key = %outcome.key, "Unexpected mutation outcome");
                self.report(e);
                return;
            }
        };

        match resolution {
            Resolution::Succeeded { already_gone } => {
                match outcome.action {
                    MutationAction::Delete => self.refresh_parent(&outcome.key),
                    MutationAction::Kill => {
                        if let Some(change) = self.processes.remove_optimistic(&outcome.key) {
                            self.publish(ViewEvent::Changed {
                                view: ViewKind::Processes,
                                changes: vec![change],
                            });
                        }
                    }
                }
                self.publish(ViewEvent::Completed {
                    key: outcome.key,
                    action: outcome.action,
                    already_gone,
                });
            }
            Resolution::Failed(e) => {
                self.report(EngineError::Reconcile(e));
            }
        }
    }

    /// Re-acquires the directory containing `key` if it is in the tree and
    /// the files view is not paused.
    fn refresh_parent(&mut self, key: &IdentityKey) {
        let Some(parent) = key.as_path().parent() else {
            return;
        };
        if !self.scheduler.should_poll(ViewKind::Files) {
            debug!(parent = %parent.display(), "Files view paused, not refreshing");
            return;
        }
        if self.tree.contains(parent) {
            self.scheduler
                .acquire(ResourceId::Directory(parent.to_path_buf()));
        }
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// The materialized directory tree, depth-first.
    pub fn file_rows(&self) -> Vec<Row> {
        self.tree.rows()
    }

    /// The process table in snapshot order.
    pub fn process_rows(&self) -> Vec<Row> {
        self.processes
            .handles()
            .map(|handle| Row::from_handle(handle, 0, false))
            .collect()
    }

    /// Rows of `view`.
    pub fn rows(&self, view: ViewKind) -> Vec<Row> {
        match view {
            ViewKind::Files => self.file_rows(),
            ViewKind::Processes => self.process_rows(),
        }
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    /// Adds or removes a bookmark. Returns `true` if `path` is now bookmarked.
    pub fn toggle_bookmark(&mut self, path: &Path) -> bool {
        let added = self.bookmarks.toggle(path);
        info!(path = %path.display(), added, "Bookmark toggled");
        added
    }

    /// Navigates to the bookmark after the current root, wrapping around.
    pub fn jump_to_next_bookmark(&mut self) -> Option<PathBuf> {
        let next = self.bookmarks.next_after(self.tree.root())?.to_path_buf();
        self.navigate(next.clone());
        Some(next)
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn publish(&self, event: ViewEvent) {
        // Ignore send error - no subscribers is fine
        let _ = self.event_publisher.send(event);
    }

    fn publish_changes(
        &self,
        view: ViewKind,
        resource: &ResourceId,
        seq: u64,
        changes: Vec<ViewChange>,
    ) {
        let (mut inserted, mut updated, mut removed) = (0usize, 0usize, 0usize);
        for change in &changes {
            match change {
                ViewChange::Inserted(_) => inserted += 1,
                ViewChange::Updated(_) => updated += 1,
                ViewChange::Removed(_) => removed += 1,
            }
        }
        debug!(resource = %resource, seq, inserted, updated, removed, "Snapshot applied");

        if !changes.is_empty() {
            self.publish(ViewEvent::Changed { view, changes });
        }
    }

    /// Publishes an error notification and hands the error back.
    fn report(&self, err: EngineError) -> EngineError {
        self.publish(ViewEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.tree.root())
            .field("processes", &self.processes.registry().len())
            .field("scheduler", &self.scheduler)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
