//! Vigil Engine - State reconciliation for live views
//!
//! This crate keeps addressable views (a lazily expanded directory tree and
//! a process table) synchronized with resources that change out-of-band:
//! - `adapter` - Blocking snapshot adapters for directories and processes
//! - `registry` - Identity-keyed view handles, the only writer of view state
//! - `cache` - Last-applied snapshot + registry per resource instance
//! - `tree` - The lazily materialized directory tree
//! - `scheduler` - Periodic and on-demand acquisition with sequence numbers
//! - `gateway` - Destructive actions (delete, kill) and their state machine
//! - `engine` - The single foreground owner tying everything together
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  Tick   ┌────────────────┐ spawn_blocking ┌────────────────┐
//! │ ticker task   │────────▶│                │───────────────▶│ SnapshotSource │
//! └───────────────┘         │     Engine     │                └───────┬────────┘
//!                           │  (foreground)  │◀──── Acquired ─────────┘
//! ┌───────────────┐ calls   │                │
//! │   host / UI   │────────▶│ diff ─▶ apply  │──── ViewEvent ────▶ broadcast
//! └───────────────┘         └────────────────┘
//! ```
//!
//! Background work never touches view handles; it only returns snapshots
//! and mutation outcomes over the `EngineMessage` channel.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod adapter;
pub mod cache;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod registry;
pub mod scheduler;
pub mod tree;

pub use adapter::{DirectoryAdapter, ProcessAdapter, SnapshotSource, SystemSource, PROCESS_COLUMNS};
pub use cache::{ResourceCache, Row};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use events::{Acquisition, EngineMessage, MutationOutcome, ViewChange, ViewEvent, ViewKind};
pub use gateway::{MutationExecutor, MutationGateway, Resolution, SystemExecutor};
pub use registry::{HandleId, ViewHandle, ViewRegistry};
pub use scheduler::{Scheduler, SchedulerState, DEFAULT_POLL_INTERVAL};
pub use tree::DirectoryTree;
