//! The view binding registry.

use indexmap::IndexMap;
use tracing::{error, warn};
use vigil_core::{DiffOp, IdentityKey};

use super::handle::ViewHandle;
use crate::events::ViewChange;

/// Maps identity keys to view handles for one resource.
///
/// The registry is the only place view state is written, and it is owned
/// by the foreground engine. There is no positional access:
/// callers resolve entries by identity at the moment of use.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    handles: IndexMap<IdentityKey, ViewHandle>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies diff operations in order and returns the changes made.
    ///
    /// An insert for an identity that already has a handle is a diff
    /// contract violation: it asserts in debug builds and is otherwise
    /// logged and skipped. Updates and removes for unknown identities are
    /// logged and skipped.
    pub fn apply(&mut self, ops: Vec<DiffOp>) -> Vec<ViewChange> {
        let mut changes = Vec::with_capacity(ops.len());

        for op in ops {
            match op {
                DiffOp::Insert(record) => {
                    let duplicate = self.handles.contains_key(&record.key);
                    debug_assert!(!duplicate, "duplicate insert for {}", record.key);
                    if duplicate {
                        error!(key = %record.key, "Insert for identity that already has a handle");
                        continue;
                    }
                    let key = record.key.clone();
                    self.handles.insert(key.clone(), ViewHandle::new(record));
                    changes.push(ViewChange::Inserted(key));
                }
                DiffOp::Update { key, kind, fields } => match self.handles.get_mut(&key) {
                    Some(handle) => {
                        handle.update(kind, fields);
                        changes.push(ViewChange::Updated(key));
                    }
                    None => warn!(key = %key, "Update for unknown identity"),
                },
                DiffOp::Remove(key) => {
                    if self.handles.shift_remove(&key).is_some() {
                        changes.push(ViewChange::Removed(key));
                    } else {
                        warn!(key = %key, "Remove for unknown identity");
                    }
                }
            }
        }

        changes
    }

    pub fn lookup(&self, key: &IdentityKey) -> Option<&ViewHandle> {
        self.handles.get(key)
    }

    /// Visits every handle in insertion order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&ViewHandle),
    {
        for handle in self.handles.values() {
            f(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
