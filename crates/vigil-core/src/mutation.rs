//! Pending-mutation state machine for destructive actions.
//!
//! ```text
//! Idle ──request──▶ PendingConfirmation(key) ──confirm(yes)──▶ Committing ──ok──▶ Done
//!                          │                                       │
//!                          └──confirm(no)──▶ Idle                  └──err──▶ Idle
//! ```
//!
//! Kills skip the confirmation step and enter `Committing` directly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MutationStateError;
use crate::identity::IdentityKey;

/// A destructive action against a live item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    /// Unlink a file or recursively remove a directory.
    Delete,
    /// Terminate a process.
    Kill,
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Kill => write!(f, "kill"),
        }
    }
}

/// Where a mutation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationPhase {
    PendingConfirmation,
    Committing,
    Done,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingConfirmation => write!(f, "awaiting confirmation"),
            Self::Committing => write!(f, "committing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// An in-flight destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub key: IdentityKey,
    pub action: MutationAction,
    pub phase: MutationPhase,
}

/// Owner of at most one mutation at a time.
///
/// `None` is the `Idle` state. `Done` is terminal for the mutation it
/// describes; a new request from `Done` starts a fresh mutation.
#[derive(Debug, Clone, Default)]
pub struct MutationSlot {
    current: Option<PendingMutation>,
}

impl MutationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&PendingMutation> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Asks for a delete; the caller must then show a confirmation.
    pub fn request_delete(&mut self, key: IdentityKey) -> Result<(), MutationStateError> {
        self.ensure_free()?;
        self.current = Some(PendingMutation {
            key,
            action: MutationAction::Delete,
            phase: MutationPhase::PendingConfirmation,
        });
        Ok(())
    }

    /// Starts a kill; kills are committed without confirmation.
    pub fn begin_kill(&mut self, key: IdentityKey) -> Result<(), MutationStateError> {
        self.ensure_free()?;
        self.current = Some(PendingMutation {
            key,
            action: MutationAction::Kill,
            phase: MutationPhase::Committing,
        });
        Ok(())
    }

    /// Answers a pending confirmation.
    ///
    /// Returns `Some(mutation)` when accepted (now `Committing`) and `None`
    /// when cancelled (back to `Idle`).
    pub fn confirm(
        &mut self,
        key: &IdentityKey,
        accept: bool,
    ) -> Result<Option<PendingMutation>, MutationStateError> {
        let awaiting = matches!(
            &self.current,
            Some(m) if &m.key == key && m.phase == MutationPhase::PendingConfirmation
        );
        if !awaiting {
            return Err(MutationStateError::NotPending(key.clone()));
        }
        if !accept {
            self.current = None;
            return Ok(None);
        }
        Ok(self.current.as_mut().map(|m| {
            m.phase = MutationPhase::Committing;
            m.clone()
        }))
    }

    /// Records the outcome of the side effect.
    ///
    /// Success moves to `Done`; failure returns to `Idle`.
    pub fn finish(&mut self, success: bool) -> Result<PendingMutation, MutationStateError> {
        let Some(mut m) = self.current.take() else {
            return Err(MutationStateError::NotCommitting);
        };
        if m.phase != MutationPhase::Committing {
            let err = MutationStateError::NotCommitting;
            self.current = Some(m);
            return Err(err);
        }
        if success {
            m.phase = MutationPhase::Done;
            self.current = Some(m.clone());
        }
        Ok(m)
    }

    fn ensure_free(&self) -> Result<(), MutationStateError> {
        match &self.current {
            Some(m) if m.phase != MutationPhase::Done => Err(MutationStateError::Busy {
                key: m.key.clone(),
                action: m.action,
                phase: m.phase,
            }),
            _ => Ok(()),
        }
    }
}
