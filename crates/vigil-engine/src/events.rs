//! Engine messages and view events.
//!
//! This module defines the message types flowing around the engine:
//! - `EngineMessage`: results from background work, delivered to the
//!   foreground owner over an mpsc channel
//! - `ViewChange`: what one applied diff operation did to a view
//! - `ViewEvent`: notifications published to the host layer over broadcast

use std::fmt;

use vigil_core::{ErrorKind, IdentityKey, MutationAction, ReconcileResult, ResourceId, Snapshot};

// ============================================================================
// Views
// ============================================================================

/// A logical view with its own scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// The lazily expanded directory tree.
    Files,
    /// The process table.
    Processes,
}

impl ViewKind {
    /// The view a resource's changes are reported under.
    pub fn of(resource: &ResourceId) -> Self {
        match resource {
            ResourceId::Directory(_) => Self::Files,
            ResourceId::Processes => Self::Processes,
        }
    }

    /// The other view.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Files => Self::Processes,
            Self::Processes => Self::Files,
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files => write!(f, "files"),
            Self::Processes => write!(f, "processes"),
        }
    }
}

// ============================================================================
// Engine Messages
// ============================================================================

/// A completed snapshot acquisition.
#[derive(Debug)]
pub struct Acquisition {
    pub resource: ResourceId,
    /// Per-resource sequence number assigned when the acquisition started.
    pub seq: u64,
    pub result: ReconcileResult<Snapshot>,
}

/// The result of an executed side effect.
#[derive(Debug)]
pub struct MutationOutcome {
    pub key: IdentityKey,
    pub action: MutationAction,
    pub result: ReconcileResult<()>,
}

/// Messages delivered to the foreground owner.
///
/// Background tasks only ever produce these; they never touch view state.
#[derive(Debug)]
pub enum EngineMessage {
    /// The periodic trigger for a view fired.
    Tick(ViewKind),

    /// A snapshot acquisition finished.
    Acquired(Acquisition),

    /// A delete or kill side effect finished.
    MutationFinished(MutationOutcome),
}

// ============================================================================
// View Events
// ============================================================================

/// One change made to a view by an applied diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    Inserted(IdentityKey),
    Updated(IdentityKey),
    Removed(IdentityKey),
}

impl ViewChange {
    pub fn key(&self) -> &IdentityKey {
        match self {
            Self::Inserted(key) | Self::Updated(key) | Self::Removed(key) => key,
        }
    }
}

/// Notifications published to the host layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// One applied diff: the entries inserted, updated or removed, in the
    /// order they were applied. Never empty.
    Changed {
        view: ViewKind,
        changes: Vec<ViewChange>,
    },

    /// The host should ask the user to confirm a destructive action.
    ShowConfirmation {
        key: IdentityKey,
        action: MutationAction,
    },

    /// A destructive action completed.
    ///
    /// `already_gone` is set when the target no longer existed, which
    /// counts as success.
    Completed {
        key: IdentityKey,
        action: MutationAction,
        already_gone: bool,
    },

    /// Something failed and the user should know.
    Error { kind: ErrorKind, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_view_of_resource() {
        assert_eq!(ViewKind::of(&ResourceId::Processes), ViewKind::Processes);
        assert_eq!(
            ViewKind::of(&ResourceId::Directory(PathBuf::from("/d"))),
            ViewKind::Files
        );
    }

    #[test]
    fn test_view_toggle() {
        assert_eq!(ViewKind::Files.toggled(), ViewKind::Processes);
        assert_eq!(ViewKind::Processes.toggled(), ViewKind::Files);
    }
}
