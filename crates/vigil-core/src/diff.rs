//! Diff engine: minimal ordered edit operations between two snapshots.
//!
//! # Output order
//!
//! ```text
//! [Insert..]  keys(new) - keys(prev)   in new's order
//! [Update..]  keys(prev) & keys(new)   in new's order, only when a field differs
//! [Remove..]  keys(prev) - keys(new)   in prev's order
//! ```
//!
//! Removes go last so they never disturb the iteration of inserts, and an
//! identity that is both removed and inserted cannot exist within one diff
//! because keys are unique per snapshot.

use crate::identity::IdentityKey;
use crate::record::{FieldValue, Record, RecordKind};
use crate::snapshot::Snapshot;

/// One edit operation against a view.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    /// A key appeared; carries the full record.
    Insert(Record),

    /// A key persisted with at least one change.
    ///
    /// `fields` holds only the changed fields, in the new record's field
    /// order followed by fields that disappeared (reported as `Empty`).
    Update {
        key: IdentityKey,
        kind: Option<RecordKind>,
        fields: Vec<(String, FieldValue)>,
    },

    /// A key disappeared.
    Remove(IdentityKey),
}

impl DiffOp {
    pub fn key(&self) -> &IdentityKey {
        match self {
            Self::Insert(record) => &record.key,
            Self::Update { key, .. } => key,
            Self::Remove(key) => key,
        }
    }
}

/// Computes the operations that turn the view of `prev` into the view of
/// `next`.
///
/// `prev` is `None` on first run, in which case every record is an insert.
pub fn diff(prev: Option<&Snapshot>, next: &Snapshot) -> Vec<DiffOp> {
    let Some(prev) = prev else {
        return next.records().cloned().map(DiffOp::Insert).collect();
    };

    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for record in next.records() {
        match prev.get(&record.key) {
            None => inserts.push(DiffOp::Insert(record.clone())),
            Some(old) => {
                if let Some(update) = diff_record(old, record) {
                    updates.push(update);
                }
            }
        }
    }

    let removes = prev
        .keys()
        .filter(|key| !next.contains(key))
        .cloned()
        .map(DiffOp::Remove);

    let mut ops = inserts;
    ops.append(&mut updates);
    ops.extend(removes);
    ops
}

/// Compares two records with the same key; `None` when they are identical.
fn diff_record(old: &Record, new: &Record) -> Option<DiffOp> {
    let mut fields: Vec<(String, FieldValue)> = new
        .fields()
        .iter()
        .filter(|(name, value)| old.value(name) != *value)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    fields.extend(
        old.field_names()
            .filter(|name| new.get(name).is_none())
            .map(|name| (name.to_string(), FieldValue::Empty)),
    );

    let kind = (old.kind != new.kind).then_some(new.kind);

    if fields.is_empty() && kind.is_none() {
        return None;
    }

    Some(DiffOp::Update {
        key: new.key.clone(),
        kind,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ResourceId;
    use crate::snapshot::SnapshotBuilder;

    fn proc(pid: u32, name: &str) -> Record {
        Record::new(IdentityKey::for_pid(pid), RecordKind::Process).with("name", name)
    }

    fn table(records: Vec<Record>) -> Snapshot {
        records
            .into_iter()
            .fold(SnapshotBuilder::new(ResourceId::Processes), SnapshotBuilder::with)
            .build()
    }

    #[test]
    fn test_first_run_is_all_inserts() {
        let next = table(vec![proc(100, "x"), proc(101, "y")]);
        let ops = diff(None, &next);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Insert(_))));
        assert_eq!(ops.first().map(DiffOp::key), Some(&IdentityKey::for_pid(100)));
    }

    #[test]
    fn test_empty_prev_behaves_like_first_run() {
        let prev = Snapshot::empty(ResourceId::Processes);
        let next = table(vec![proc(100, "x")]);
        assert_eq!(diff(Some(&prev), &next), diff(None, &next));
    }

    #[test]
    fn test_identical_snapshots_yield_no_ops() {
        let s = table(vec![proc(100, "x"), proc(101, "y")]);
        assert!(diff(Some(&s), &s).is_empty());
    }

    #[test]
    fn test_process_table_removal_scenario() {
        let s1 = table(vec![proc(100, "x"), proc(101, "y")]);
        let s2 = table(vec![proc(100, "x")]);
        assert_eq!(
            diff(Some(&s1), &s2),
            vec![DiffOp::Remove(IdentityKey::for_pid(101))]
        );
    }

    #[test]
    fn test_update_carries_only_changed_fields() {
        let s1 = table(vec![proc(100, "x").with("status", "sleeping")]);
        let s2 = table(vec![proc(100, "x").with("status", "running")]);
        assert_eq!(
            diff(Some(&s1), &s2),
            vec![DiffOp::Update {
                key: IdentityKey::for_pid(100),
                kind: None,
                fields: vec![("status".to_string(), FieldValue::from("running"))],
            }]
        );
    }

    #[test]
    fn test_vanished_field_is_reported_empty() {
        let s1 = table(vec![proc(100, "x").with("username", "root")]);
        let s2 = table(vec![proc(100, "x")]);
        let ops = diff(Some(&s1), &s2);
        assert_eq!(
            ops,
            vec![DiffOp::Update {
                key: IdentityKey::for_pid(100),
                kind: None,
                fields: vec![("username".to_string(), FieldValue::Empty)],
            }]
        );
    }

    #[test]
    fn test_kind_change_is_an_update() {
        let key = IdentityKey::new("/d/thing");
        let s1 = SnapshotBuilder::new(ResourceId::Directory("/d".into()))
            .with(Record::new(key.clone(), RecordKind::File).with("name", "thing"))
            .build();
        let s2 = SnapshotBuilder::new(ResourceId::Directory("/d".into()))
            .with(Record::new(key.clone(), RecordKind::Directory).with("name", "thing"))
            .build();
        assert_eq!(
            diff(Some(&s1), &s2),
            vec![DiffOp::Update {
                key,
                kind: Some(RecordKind::Directory),
                fields: vec![],
            }]
        );
    }

    #[test]
    fn test_ops_ordered_inserts_updates_removes() {
        let s1 = table(vec![proc(1, "a"), proc(2, "b"), proc(3, "c")]);
        let s2 = table(vec![proc(4, "d"), proc(2, "B"), proc(5, "e")]);
        let ops = diff(Some(&s1), &s2);

        let shape: Vec<(&str, &str)> = ops
            .iter()
            .map(|op| match op {
                DiffOp::Insert(r) => ("insert", r.key.as_str()),
                DiffOp::Update { key, .. } => ("update", key.as_str()),
                DiffOp::Remove(key) => ("remove", key.as_str()),
            })
            .collect();

        assert_eq!(
            shape,
            vec![
                ("insert", "4"),
                ("insert", "5"),
                ("update", "2"),
                ("remove", "1"),
                ("remove", "3"),
            ]
        );
    }

    #[test]
    fn test_unchanged_keys_emit_nothing() {
        let s1 = table(vec![proc(1, "a"), proc(2, "b")]);
        let s2 = table(vec![proc(1, "a"), proc(2, "changed")]);
        let ops = diff(Some(&s1), &s2);
        assert_eq!(ops.len(), 1);
        assert!(ops.iter().all(|op| op.key() != &IdentityKey::for_pid(1)));
    }
}
