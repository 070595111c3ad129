//! Records: the unit of state held in a snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::IdentityKey;

// ============================================================================
// Field Values
// ============================================================================

/// A scalar field value.
///
/// `Empty` stands for "absent": records never store it, and an update
/// carrying `Empty` clears the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl FieldValue {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric view of the value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.parse().ok(),
            Self::Empty => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:.1}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        Self::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Empty)
    }
}

// ============================================================================
// Record Kind
// ============================================================================

/// What a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    File,
    Directory,
    Process,
}

impl RecordKind {
    #[must_use]
    pub fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "dir"),
            Self::Process => write!(f, "process"),
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// One entity observed at one poll instant.
///
/// Field order is insertion order and is preserved through diffs.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: IdentityKey,
    pub kind: RecordKind,
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(key: IdentityKey, kind: RecordKind) -> Self {
        Self {
            key,
            kind,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter. `Empty` values are not stored.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Sets a field in place; `Empty` removes it.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        if value.is_empty() {
            self.fields.shift_remove(name);
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }

    /// Returns a field, or `None` when absent.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns a field, treating absence as `Empty`.
    pub fn value(&self, name: &str) -> &FieldValue {
        self.fields.get(name).unwrap_or(&FieldValue::Empty)
    }

    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
