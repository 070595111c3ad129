//! Immutable point-in-time snapshots.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::warn;

use crate::error::ReconcileError;
use crate::identity::{IdentityKey, ResourceId};
use crate::record::Record;

/// An immutable mapping from identity key to record for one resource,
/// captured at one poll instant.
///
/// Snapshots are shared as `Arc<Snapshot>`; nothing mutates one after
/// `SnapshotBuilder::build`. Deriving a changed snapshot (see
/// [`Snapshot::without`]) always produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    resource: ResourceId,
    captured_at: DateTime<Utc>,
    records: IndexMap<IdentityKey, Record>,
}

impl Snapshot {
    /// An empty snapshot, used as the "previous" state on first run.
    pub fn empty(resource: ResourceId) -> Self {
        Self {
            resource,
            captured_at: Utc::now(),
            records: IndexMap::new(),
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identity keys in capture order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.records.keys()
    }

    /// Records in capture order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Returns a copy of this snapshot without `key`.
    ///
    /// Used when a row is removed optimistically: the baseline for the next
    /// diff must no longer contain it so a later poll can re-insert it.
    #[must_use]
    pub fn without(&self, key: &IdentityKey) -> Self {
        let mut records = self.records.clone();
        records.shift_remove(key);
        Self {
            resource: self.resource.clone(),
            captured_at: self.captured_at,
            records,
        }
    }
}

/// Accumulates records for one snapshot.
#[derive(Debug)]
pub struct SnapshotBuilder {
    resource: ResourceId,
    records: IndexMap<IdentityKey, Record>,
    duplicates: usize,
}

impl SnapshotBuilder {
    pub fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            records: IndexMap::new(),
            duplicates: 0,
        }
    }

    pub fn with_capacity(resource: ResourceId, capacity: usize) -> Self {
        Self {
            resource,
            records: IndexMap::with_capacity(capacity),
            duplicates: 0,
        }
    }

    /// Adds a record.
    ///
    /// Keys are unique within a snapshot: a duplicate is rejected, the
    /// first record wins, and the error is returned for the caller to log.
    pub fn push(&mut self, record: Record) -> Result<(), ReconcileError> {
        if self.records.contains_key(&record.key) {
            self.duplicates += 1;
            return Err(ReconcileError::InvariantViolation(format!(
                "duplicate identity {} in snapshot of {}",
                record.key, self.resource
            )));
        }
        self.records.insert(record.key.clone(), record);
        Ok(())
    }

    /// Builder-style variant of [`push`](Self::push) that logs duplicates.
    #[must_use]
    pub fn with(mut self, record: Record) -> Self {
        if let Err(e) = self.push(record) {
            warn!(error = %e, "Dropping duplicate record");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of duplicate keys rejected so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            resource: self.resource,
            captured_at: Utc::now(),
            records: self.records,
        }
    }
}
