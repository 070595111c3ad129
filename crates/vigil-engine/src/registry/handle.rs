//! View handles.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use vigil_core::{FieldValue, IdentityKey, Record, RecordKind};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque handle id, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One addressable view entry (a tree node or a table row).
///
/// Owned exclusively by a [`ViewRegistry`](super::ViewRegistry). The
/// identity key is fixed at creation; fields change in place on update and
/// bump `version`.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    id: HandleId,
    record: Record,
    version: u64,
}

impl ViewHandle {
    pub(crate) fn new(record: Record) -> Self {
        Self {
            id: HandleId::next(),
            record,
            version: 0,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn key(&self) -> &IdentityKey {
        &self.record.key
    }

    pub fn kind(&self) -> RecordKind {
        self.record.kind
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        self.record.fields()
    }

    pub fn value(&self, name: &str) -> &FieldValue {
        self.record.value(name)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Applies a partial update. Only the listed fields are touched.
    pub(crate) fn update(&mut self, kind: Option<RecordKind>, fields: Vec<(String, FieldValue)>) {
        if let Some(kind) = kind {
            self.record.kind = kind;
        }
        for (name, value) in fields {
            self.record.set(&name, value);
        }
        self.version += 1;
    }
}
