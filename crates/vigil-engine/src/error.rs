//! Engine error types.

use thiserror::Error;
use vigil_core::{ErrorKind, IdentityKey, MutationStateError, ReconcileError};

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Another destructive action is already pending or committing.
    #[error("busy: {0}")]
    Busy(MutationStateError),

    /// The mutation state machine rejected a transition.
    #[error(transparent)]
    Mutation(MutationStateError),

    /// The identity is not present in any applied snapshot.
    #[error("unknown identity: {0}")]
    UnknownIdentity(IdentityKey),

    /// An acquisition or side effect failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The engine message channel was closed.
    #[error("engine channel closed")]
    ChannelClosed,
}

impl EngineError {
    /// Returns the coarse kind carried by error notifications.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy(_) => ErrorKind::Busy,
            Self::Mutation(_) => ErrorKind::InvariantViolation,
            Self::UnknownIdentity(_) => ErrorKind::NotFound,
            Self::Reconcile(e) => e.kind(),
            Self::ChannelClosed => ErrorKind::Io,
        }
    }
}

impl From<MutationStateError> for EngineError {
    fn from(err: MutationStateError) -> Self {
        match err {
            MutationStateError::Busy { .. } => Self::Busy(err),
            other => Self::Mutation(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{MutationAction, MutationPhase};

    #[test]
    fn test_busy_maps_to_busy_kind() {
        let err: EngineError = MutationStateError::Busy {
            key: IdentityKey::for_pid(7),
            action: MutationAction::Kill,
            phase: MutationPhase::Committing,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Busy);
        assert_eq!(err.to_string(), "busy: a kill of 7 is already committing");
    }

    #[test]
    fn test_reconcile_kind_passes_through() {
        let err = EngineError::from(ReconcileError::PermissionDenied("/root".into()));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_not_pending_is_not_busy() {
        let err: EngineError = MutationStateError::NotCommitting.into();
        assert!(matches!(err, EngineError::Mutation(_)));
    }
}
