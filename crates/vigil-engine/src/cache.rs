//! Per-resource caches.
//!
//! A cache pairs the last applied snapshot of one resource instance with
//! the registry derived from it. The snapshot is the diff baseline; the
//! registry is what the host layer reads.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use vigil_core::{diff, DiffOp, FieldValue, IdentityKey, RecordKind, ResourceId, Snapshot};

use crate::events::ViewChange;
use crate::registry::{ViewHandle, ViewRegistry};

/// A display row: one view handle resolved at read time.
///
/// Rows are owned copies; they never alias registry state.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Nesting depth in the tree; always 0 for process rows.
    pub depth: usize,
    pub key: IdentityKey,
    pub kind: RecordKind,
    pub fields: IndexMap<String, FieldValue>,
    /// Whether a directory row is currently expanded.
    pub expanded: bool,
}

impl Row {
    pub fn from_handle(handle: &ViewHandle, depth: usize, expanded: bool) -> Self {
        Self {
            depth,
            key: handle.key().clone(),
            kind: handle.kind(),
            fields: handle.fields().clone(),
            expanded,
        }
    }

    /// Returns a field, treating absence as `Empty`.
    pub fn value(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&FieldValue::Empty)
    }
}

/// Last-applied snapshot and view registry for one resource instance.
#[derive(Debug)]
pub struct ResourceCache {
    resource: ResourceId,
    last_applied: Option<Arc<Snapshot>>,
    registry: ViewRegistry,
    /// Highest sequence number accepted so far, successful or not.
    last_seq: u64,
}

impl ResourceCache {
    pub fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            last_applied: None,
            registry: ViewRegistry::new(),
            last_seq: 0,
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn last_applied(&self) -> Option<&Arc<Snapshot>> {
        self.last_applied.as_ref()
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// True once at least one snapshot has been applied.
    pub fn is_materialized(&self) -> bool {
        self.last_applied.is_some()
    }

    /// Records `seq` as the newest result if it is newer than anything
    /// accepted before. Returns `false` for a stale result.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.last_seq {
            return false;
        }
        self.last_seq = seq;
        true
    }

    /// Diffs `snapshot` against the baseline and applies the result.
    ///
    /// Returns `None` without touching anything when `seq` is stale.
    pub fn apply(&mut self, seq: u64, snapshot: Arc<Snapshot>) -> Option<Vec<ViewChange>> {
        if !self.accept(seq) {
            debug!(
                resource = %self.resource,
                seq,
                last_seq = self.last_seq,
                "Discarding stale snapshot"
            );
            return None;
        }

        let ops = diff(self.last_applied.as_deref(), &snapshot);
        let changes = self.registry.apply(ops);
        self.last_applied = Some(snapshot);
        Some(changes)
    }

    /// Removes `key` ahead of the next poll.
    ///
    /// The baseline becomes a copy of the last snapshot without `key`, so a
    /// later poll that still sees it re-inserts it.
    pub fn remove_optimistic(&mut self, key: &IdentityKey) -> Option<ViewChange> {
        let baseline = self.last_applied.as_ref()?;
        if !baseline.contains(key) {
            return None;
        }
        let derived = Arc::new(baseline.without(key));
        let change = self
            .registry
            .apply(vec![DiffOp::Remove(key.clone())])
            .into_iter()
            .next();
        self.last_applied = Some(derived);
        change
    }

    pub fn lookup(&self, key: &IdentityKey) -> Option<&ViewHandle> {
        self.registry.lookup(key)
    }

    /// Handles in the order of the last applied snapshot.
    pub fn handles(&self) -> impl Iterator<Item = &ViewHandle> + '_ {
        self.last_applied
            .iter()
            .flat_map(|snapshot| snapshot.keys())
            .filter_map(|key| self.registry.lookup(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{Record, RecordKind, SnapshotBuilder};

    // Per CLAUDE.md: Tests CAN use .unwrap()

    fn table(pids: &[u32]) -> Arc<Snapshot> {
        let snapshot = pids
            .iter()
            .map(|pid| {
                Record::new(IdentityKey::for_pid(*pid), RecordKind::Process)
                    .with("name", format!("p{pid}"))
            })
            .fold(SnapshotBuilder::new(ResourceId::Processes), SnapshotBuilder::with)
            .build();
        Arc::new(snapshot)
    }

    fn keys(cache: &ResourceCache) -> Vec<String> {
        cache.handles().map(|h| h.key().to_string()).collect()
    }

    #[test]
    fn test_first_apply_inserts_everything() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        assert!(!cache.is_materialized());

        let changes = cache.apply(1, table(&[100, 101])).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(cache.is_materialized());
        assert_eq!(keys(&cache), vec!["100", "101"]);
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        cache.apply(2, table(&[100])).unwrap();

        // Acquisition 1 started earlier but finished later
        assert!(cache.apply(1, table(&[100, 101, 102])).is_none());
        assert_eq!(keys(&cache), vec!["100"]);
        assert_eq!(cache.last_seq(), 2);
    }

    #[test]
    fn test_same_seq_is_not_applied_twice() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        cache.apply(1, table(&[100])).unwrap();
        assert!(cache.apply(1, table(&[])).is_none());
        assert_eq!(cache.registry().len(), 1);
    }

    #[test]
    fn test_removal_scenario_leaves_survivor() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        cache.apply(1, table(&[100, 101])).unwrap();
        let changes = cache.apply(2, table(&[100])).unwrap();

        assert_eq!(changes, vec![ViewChange::Removed(IdentityKey::for_pid(101))]);
        assert_eq!(keys(&cache), vec!["100"]);
    }

    #[test]
    fn test_optimistic_removal_is_reconciled_by_next_poll() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        let first = table(&[100, 101]);
        cache.apply(1, Arc::clone(&first)).unwrap();

        let change = cache.remove_optimistic(&IdentityKey::for_pid(101));
        assert_eq!(change, Some(ViewChange::Removed(IdentityKey::for_pid(101))));
        assert_eq!(keys(&cache), vec!["100"]);
        // The applied snapshot itself was not mutated
        assert_eq!(first.len(), 2);

        // Process survived the signal: the next poll brings it back
        let changes = cache.apply(2, table(&[100, 101])).unwrap();
        assert_eq!(changes, vec![ViewChange::Inserted(IdentityKey::for_pid(101))]);
    }

    #[test]
    fn test_optimistic_removal_of_unknown_key_is_noop() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        assert!(cache.remove_optimistic(&IdentityKey::for_pid(1)).is_none());
        cache.apply(1, table(&[100])).unwrap();
        assert!(cache.remove_optimistic(&IdentityKey::for_pid(1)).is_none());
        assert_eq!(cache.registry().len(), 1);
    }

    #[test]
    fn test_handles_follow_latest_snapshot_order() {
        let mut cache = ResourceCache::new(ResourceId::Processes);
        cache.apply(1, table(&[100, 300])).unwrap();
        cache.apply(2, table(&[100, 200, 300])).unwrap();
        assert_eq!(keys(&cache), vec!["100", "200", "300"]);
    }
}
