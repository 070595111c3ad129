//! Snapshot adapters.
//!
//! An adapter enumerates one resource and returns an immutable
//! [`Snapshot`]. Adapters never mutate external state and are blocking;
//! the scheduler only calls them from `spawn_blocking`.
//!
//! Per-entry failures (an entry vanishing, a permission error on one
//! child) are absorbed inside the adapter. Only failure to open the
//! resource root is returned to the caller.

mod directory;
mod process;

pub use directory::DirectoryAdapter;
pub use process::{ProcessAdapter, PROCESS_COLUMNS};

use vigil_core::{ReconcileResult, ResourceId, Snapshot};

/// Produces snapshots for resource descriptors.
///
/// Implemented by [`SystemSource`] for the real filesystem and process
/// table, and by scripted sources in tests.
pub trait SnapshotSource: Send + Sync + 'static {
    fn acquire(&self, resource: &ResourceId) -> ReconcileResult<Snapshot>;
}

/// Reads the live filesystem and OS process table.
#[derive(Debug)]
pub struct SystemSource {
    directory: DirectoryAdapter,
    process: ProcessAdapter,
}

impl SystemSource {
    pub fn new(show_hidden: bool) -> Self {
        Self {
            directory: DirectoryAdapter::new(show_hidden),
            process: ProcessAdapter::new(),
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SnapshotSource for SystemSource {
    fn acquire(&self, resource: &ResourceId) -> ReconcileResult<Snapshot> {
        match resource {
            ResourceId::Directory(path) => self.directory.snapshot(path),
            ResourceId::Processes => Ok(self.process.snapshot()),
        }
    }
}
