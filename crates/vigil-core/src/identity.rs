//! Identity keys and resource descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Identity Key
// ============================================================================

/// Stable key used to correlate a record across snapshots.
///
/// For filesystem entries this is the absolute path; for processes it is
/// the decimal process id. The key never changes for the lifetime of the
/// view handle bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Creates a key from an arbitrary string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a filesystem entry.
    ///
    /// The path is used as given; callers pass absolute paths so that the
    /// same entry reached through different parents resolves to one key.
    pub fn for_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    /// Key for a process.
    pub fn for_pid(pid: u32) -> Self {
        Self(pid.to_string())
    }

    /// Interprets the key as a process id.
    pub fn as_pid(&self) -> Option<u32> {
        self.0.parse().ok()
    }

    /// Interprets the key as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdentityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for IdentityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Resource Descriptor
// ============================================================================

/// Names one logical resource instance, and therefore one cache.
///
/// Every expanded directory is its own resource; the whole process table
/// is a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// The immediate children of one directory.
    Directory(PathBuf),
    /// All processes visible to this user.
    Processes,
}

impl ResourceId {
    /// Returns the directory path for directory resources.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Self::Directory(path) => Some(path),
            Self::Processes => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(path) => write!(f, "dir:{}", path.display()),
            Self::Processes => write!(f, "processes"),
        }
    }
}
