//! Domain-specific error types following panic-free policy.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::identity::IdentityKey;
use crate::mutation::{MutationAction, MutationPhase};

/// Coarse classification of a reconciliation error.
///
/// Carried by error notifications so the host layer can pick a message
/// style without matching on the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyGone,
    Transient,
    InvariantViolation,
    Io,
    Busy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::AlreadyGone => "already gone",
            Self::Transient => "transient",
            Self::InvariantViolation => "invariant violation",
            Self::Io => "i/o error",
            Self::Busy => "busy",
        };
        f.write_str(label)
    }
}

/// Errors raised while acquiring, diffing or mutating a resource.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// The resource root does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource root exists but may not be read or changed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The target of a destructive action no longer exists.
    ///
    /// Destructive operations treat this as success.
    #[error("already gone: {0}")]
    AlreadyGone(String),

    /// An entity vanished while being enumerated.
    ///
    /// Absorbed by the snapshot adapters, never surfaced for a batch.
    #[error("vanished during enumeration: {0}")]
    Transient(String),

    /// A programming error, e.g. a duplicate identity on insert.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Any other I/O failure.
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
}

impl ReconcileError {
    /// Classifies an `io::Error` raised while touching `path`.
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        let display = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(display),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(display),
            _ => Self::Io {
                path: display,
                message: err.to_string(),
            },
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::AlreadyGone(_) => ErrorKind::AlreadyGone,
            Self::Transient(_) => ErrorKind::Transient,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// True when a destructive operation should report success anyway.
    #[must_use]
    pub fn is_already_gone(&self) -> bool {
        matches!(self, Self::AlreadyGone(_))
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Illegal transitions of the pending-mutation state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationStateError {
    /// Another mutation is pending or committing.
    #[error("a {action} of {key} is already {phase}")]
    Busy {
        key: IdentityKey,
        action: MutationAction,
        phase: MutationPhase,
    },

    /// A confirmation arrived for an identity that is not awaiting one.
    #[error("no confirmation pending for {0}")]
    NotPending(IdentityKey),

    /// A commit result arrived while nothing was committing.
    #[error("nothing is committing")]
    NotCommitting,
}
