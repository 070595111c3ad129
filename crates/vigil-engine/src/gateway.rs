//! Mutation gateway: destructive actions against live items.
//!
//! The gateway owns the single [`MutationSlot`] and runs side effects on
//! the blocking pool, off the apply path. Outcomes come back as
//! [`EngineMessage::MutationFinished`]; the engine then re-enters the
//! normal refresh pipeline instead of editing views directly.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - OS errors are classified, never unwrapped

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vigil_core::{
    IdentityKey, MutationAction, MutationSlot, MutationStateError, PendingMutation,
    ReconcileError, ReconcileResult,
};

use crate::error::{EngineError, EngineResult};
use crate::events::{EngineMessage, MutationOutcome};

// ============================================================================
// Executors
// ============================================================================

/// Performs the external side effect of a mutation.
///
/// A target that no longer exists must be reported as
/// [`ReconcileError::AlreadyGone`].
pub trait MutationExecutor: Send + Sync + 'static {
    /// Unlinks a file or recursively removes a directory.
    fn delete_path(&self, path: &Path) -> ReconcileResult<()>;

    /// Terminates a process.
    fn terminate(&self, pid: u32) -> ReconcileResult<()>;
}

/// Executes mutations against the real filesystem and process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl MutationExecutor for SystemExecutor {
    fn delete_path(&self, path: &Path) -> ReconcileResult<()> {
        // symlink_metadata so a link is removed, not its target
        let metadata = fs::symlink_metadata(path).map_err(|e| classify_delete(path, &e))?;
        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| classify_delete(path, &e))
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> ReconcileResult<()> {
        // pid 0 and values above i32::MAX would address process groups
        let raw = match i32::try_from(pid) {
            Ok(raw) if raw > 0 => raw,
            _ => {
                return Err(ReconcileError::PermissionDenied(format!(
                    "refusing to signal pid {pid}"
                )))
            }
        };

        let result = unsafe { libc::kill(raw, libc::SIGKILL) };
        if result == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        Err(match err.raw_os_error() {
            Some(libc::ESRCH) => ReconcileError::AlreadyGone(pid.to_string()),
            Some(libc::EPERM) => ReconcileError::PermissionDenied(pid.to_string()),
            _ => ReconcileError::Io {
                path: pid.to_string(),
                message: err.to_string(),
            },
        })
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> ReconcileResult<()> {
        Err(ReconcileError::PermissionDenied(format!(
            "killing process {pid} is only supported on Unix systems"
        )))
    }
}

fn classify_delete(path: &Path, err: &io::Error) -> ReconcileError {
    match err.kind() {
        io::ErrorKind::NotFound => ReconcileError::AlreadyGone(path.display().to_string()),
        _ => ReconcileError::from_io(path, err),
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// How a finished mutation resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The side effect happened, or its target was already gone.
    Succeeded { already_gone: bool },
    /// The side effect failed; views are left as they were.
    Failed(ReconcileError),
}

/// Runs destructive actions, one at a time.
pub struct MutationGateway {
    slot: MutationSlot,
    executor: Arc<dyn MutationExecutor>,
    sender: mpsc::UnboundedSender<EngineMessage>,
}

impl MutationGateway {
    pub fn new(
        executor: Arc<dyn MutationExecutor>,
        sender: mpsc::UnboundedSender<EngineMessage>,
    ) -> Self {
        Self {
            slot: MutationSlot::new(),
            executor,
            sender,
        }
    }

    pub fn pending(&self) -> Option<&PendingMutation> {
        self.slot.current()
    }

    /// Moves to `PendingConfirmation` for a delete of `key`.
    pub fn request_delete(&mut self, key: IdentityKey) -> EngineResult<()> {
        self.slot.request_delete(key)?;
        Ok(())
    }

    /// Answers the pending confirmation for `key`.
    ///
    /// Returns the mutation to commit when accepted, `None` when cancelled.
    pub fn confirm(
        &mut self,
        key: &IdentityKey,
        accept: bool,
    ) -> EngineResult<Option<PendingMutation>> {
        let committing = self.slot.confirm(key, accept)?;
        if committing.is_none() {
            info!(key = %key, "Delete cancelled");
        }
        Ok(committing)
    }

    /// Moves straight to `Committing` for a kill of `key`.
    pub fn begin_kill(&mut self, key: IdentityKey) -> EngineResult<PendingMutation> {
        self.slot.begin_kill(key)?;
        self.slot
            .current()
            .cloned()
            .ok_or(EngineError::Mutation(MutationStateError::NotCommitting))
    }

    /// Runs the side effect of a committing mutation on the blocking pool.
    ///
    /// # Errors
    ///
    /// A kill whose key is not a pid fails immediately and resets the slot.
    pub fn commit(&mut self, mutation: &PendingMutation) -> EngineResult<()> {
        let key = mutation.key.clone();
        let action = mutation.action;

        let pid = match action {
            MutationAction::Kill => match key.as_pid() {
                Some(pid) => Some(pid),
                None => {
                    // Back to Idle; the key never named a process
                    let _ = self.slot.finish(false);
                    return Err(EngineError::UnknownIdentity(key));
                }
            },
            MutationAction::Delete => None,
        };

        let executor = Arc::clone(&self.executor);
        let sender = self.sender.clone();

        info!(key = %key, action = %action, "Committing mutation");
        tokio::task::spawn_blocking(move || {
            let result = match pid {
                Some(pid) => executor.terminate(pid),
                None => executor.delete_path(key.as_path()),
            };
            // Ignore send error - engine may have shut down
            let _ = sender.send(EngineMessage::MutationFinished(MutationOutcome {
                key,
                action,
                result,
            }));
        });

        Ok(())
    }

    /// Records a side effect's outcome.
    ///
    /// `AlreadyGone` counts as success.
    pub fn finish(&mut self, outcome: &MutationOutcome) -> EngineResult<Resolution> {
        let resolution = match &outcome.result {
            Ok(()) => Resolution::Succeeded {
                already_gone: false,
            },
            Err(e) if e.is_already_gone() => Resolution::Succeeded { already_gone: true },
            Err(e) => Resolution::Failed(e.clone()),
        };

        let success = matches!(resolution, Resolution::Succeeded { .. });
        let finished = self.slot.finish(success)?;
        if finished.key != outcome.key {
            warn!(
                expected = %finished.key,
                got = %outcome.key,
                "Mutation outcome for a different identity"
            );
        }

        match &resolution {
            Resolution::Succeeded { already_gone } => {
                info!(key = %outcome.key, action = %outcome.action, already_gone, "Mutation done")
            }
            Resolution::Failed(e) => {
                warn!(key = %outcome.key, action = %outcome.action, error = %e, "Mutation failed")
            }
        }
        debug!(slot = ?self.slot.current(), "Mutation slot after finish");

        Ok(resolution)
    }
}

impl fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationGateway")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vigil_core::{ErrorKind, MutationPhase};

    // Per CLAUDE.md: Tests CAN use .unwrap()

    struct NoopExecutor;

    impl MutationExecutor for NoopExecutor {
        fn delete_path(&self, _path: &Path) -> ReconcileResult<()> {
            Ok(())
        }

        fn terminate(&self, pid: u32) -> ReconcileResult<()> {
            Err(ReconcileError::AlreadyGone(pid.to_string()))
        }
    }

    fn gateway() -> (MutationGateway, mpsc::UnboundedReceiver<EngineMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MutationGateway::new(Arc::new(NoopExecutor), tx), rx)
    }

    async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<EngineMessage>) -> MutationOutcome {
        match rx.recv().await.unwrap() {
            EngineMessage::MutationFinished(outcome) => outcome,
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_system_delete_of_missing_path_is_already_gone() {
        let dir = TempDir::new().unwrap();
        let err = SystemExecutor
            .delete_path(&dir.path().join("never-existed"))
            .unwrap_err();
        assert!(err.is_already_gone());
    }

    #[test]
    fn test_system_delete_removes_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        let sub = dir.path().join("sub");
        fs::write(&file, "x").unwrap();
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("inner"), "y").unwrap();

        SystemExecutor.delete_path(&file).unwrap();
        SystemExecutor.delete_path(&sub).unwrap();
        assert!(!file.exists());
        assert!(!sub.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_refuses_pid_zero() {
        let err = SystemExecutor.terminate(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_kill_of_exited_process_is_already_gone() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let err = SystemExecutor.terminate(pid).unwrap_err();
        assert!(err.is_already_gone());
    }

    #[tokio::test]
    async fn test_delete_flow_reports_outcome() {
        let (mut gateway, mut rx) = gateway();
        let key = IdentityKey::new("/d/a.txt");

        gateway.request_delete(key.clone()).unwrap();
        let committing = gateway.confirm(&key, true).unwrap().unwrap();
        gateway.commit(&committing).unwrap();

        let outcome = next_outcome(&mut rx).await;
        assert_eq!(outcome.key, key);
        assert_eq!(
            gateway.finish(&outcome).unwrap(),
            Resolution::Succeeded {
                already_gone: false
            }
        );
        assert_eq!(
            gateway.pending().map(|m| m.phase),
            Some(MutationPhase::Done)
        );
    }

    #[tokio::test]
    async fn test_kill_of_vanished_process_is_success() {
        let (mut gateway, mut rx) = gateway();
        let key = IdentityKey::for_pid(4242);

        let pending = gateway.begin_kill(key.clone()).unwrap();
        gateway.commit(&pending).unwrap();

        let outcome = next_outcome(&mut rx).await;
        assert_eq!(
            gateway.finish(&outcome).unwrap(),
            Resolution::Succeeded { already_gone: true }
        );
    }

    #[tokio::test]
    async fn test_failure_returns_slot_to_idle() {
        let (mut gateway, _rx) = gateway();
        let key = IdentityKey::for_pid(1);
        gateway.begin_kill(key.clone()).unwrap();

        let resolution = gateway
            .finish(&MutationOutcome {
                key,
                action: MutationAction::Kill,
                result: Err(ReconcileError::PermissionDenied("1".into())),
            })
            .unwrap();
        assert!(matches!(resolution, Resolution::Failed(_)));
        assert!(gateway.pending().is_none());
    }

    #[tokio::test]
    async fn test_second_request_is_busy() {
        let (mut gateway, _rx) = gateway();
        gateway.request_delete(IdentityKey::new("/d/a.txt")).unwrap();
        let err = gateway.begin_kill(IdentityKey::for_pid(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[tokio::test]
    async fn test_kill_of_non_pid_key_is_rejected() {
        let (mut gateway, _rx) = gateway();
        let pending = gateway.begin_kill(IdentityKey::new("not-a-pid")).unwrap();
        assert!(matches!(
            gateway.commit(&pending),
            Err(EngineError::UnknownIdentity(_))
        ));
        assert!(gateway.pending().is_none());
    }
}
