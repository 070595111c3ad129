//! One-level directory enumeration.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use tracing::{debug, trace};
use vigil_core::{
    IdentityKey, ReconcileError, ReconcileResult, Record, RecordKind, ResourceId, Snapshot,
    SnapshotBuilder,
};

/// Enumerates the immediate children of a directory.
#[derive(Debug, Clone)]
pub struct DirectoryAdapter {
    show_hidden: bool,
}

impl DirectoryAdapter {
    pub fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }

    /// Snapshots the immediate entries of `path`.
    ///
    /// Records carry `name` and, for files, `size`. Directories come first,
    /// then everything is ordered by name. Symlinks are classified by their
    /// target; dangling links and entries that cannot be stat'ed are skipped.
    ///
    /// # Errors
    ///
    /// Fails only when `path` itself cannot be opened.
    pub fn snapshot(&self, path: &Path) -> ReconcileResult<Snapshot> {
        let entries = fs::read_dir(path).map_err(|e| ReconcileError::from_io(path, &e))?;

        let mut records: Vec<Record> = entries
            .flatten()
            .filter_map(|entry| self.classify(&entry.path()))
            .collect();
        records.sort_by(directories_first);

        let resource = ResourceId::Directory(path.to_path_buf());
        let mut builder = SnapshotBuilder::with_capacity(resource, records.len());
        for record in records {
            if let Err(e) = builder.push(record) {
                debug!(error = %e, "Skipping duplicate directory entry");
            }
        }

        let snapshot = builder.build();
        trace!(path = %path.display(), entries = snapshot.len(), "Directory enumerated");
        Ok(snapshot)
    }

    fn classify(&self, path: &Path) -> Option<Record> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        if !self.show_hidden && name.starts_with('.') {
            return None;
        }

        // Follows symlinks; a dangling link fails here and is skipped.
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "Skipping unreadable entry");
                return None;
            }
        };

        let key = IdentityKey::for_path(path);
        let record = if metadata.is_dir() {
            Record::new(key, RecordKind::Directory).with("name", name)
        } else {
            Record::new(key, RecordKind::File)
                .with("name", name)
                .with("size", metadata.len())
        };
        Some(record)
    }
}

impl Default for DirectoryAdapter {
    fn default() -> Self {
        Self::new(true)
    }
}

fn directories_first(a: &Record, b: &Record) -> Ordering {
    b.kind
        .is_directory()
        .cmp(&a.kind.is_directory())
        .then_with(|| a.value("name").to_string().cmp(&b.value("name").to_string()))
}
