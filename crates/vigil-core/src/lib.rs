//! Vigil Core - Shared reconciliation types
//!
//! This crate provides the pure domain types shared between
//! the engine (`vigil-engine`) and the TUI (`vigil-tui`):
//! identity keys, records, immutable snapshots, the diff engine,
//! the mutation state machine and the bookmark set.
//!
//! Nothing in this crate performs I/O.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod bookmark;
pub mod diff;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod record;
pub mod snapshot;

// Re-exports for convenience
pub use bookmark::{BookmarkSet, BookmarkStore};
pub use diff::{diff, DiffOp};
pub use error::{ErrorKind, MutationStateError, ReconcileError, ReconcileResult};
pub use identity::{IdentityKey, ResourceId};
pub use mutation::{MutationAction, MutationPhase, MutationSlot, PendingMutation};
pub use record::{FieldValue, Record, RecordKind};
pub use snapshot::{Snapshot, SnapshotBuilder};
