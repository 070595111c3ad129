//! Bookmarked paths.
//!
//! Bookmarks have a lifecycle independent of the file tree: a bookmark may
//! point at a path that was deleted since, and lookups must cope with that.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A set of bookmarked paths.
///
/// Membership semantics only; iteration order is sorted for stable display
/// but carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet {
    paths: BTreeSet<PathBuf>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path. Returns `false` if it was already bookmarked.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    /// Removes a path. Removing a path never bookmarked is a no-op.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }

    /// Adds the path if absent, removes it otherwise. Returns the new state.
    pub fn toggle(&mut self, path: &Path) -> bool {
        if self.paths.remove(path) {
            false
        } else {
            self.paths.insert(path.to_path_buf());
            true
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// The bookmark following `current`, wrapping around.
    ///
    /// `current` need not be bookmarked itself.
    pub fn next_after(&self, current: &Path) -> Option<&Path> {
        self.paths
            .iter()
            .find(|p| p.as_path() > current)
            .or_else(|| self.paths.iter().next())
            .map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Loads and saves a bookmark set.
///
/// The storage format belongs to the implementor.
pub trait BookmarkStore {
    type Error: std::error::Error;

    fn load(&self) -> Result<BookmarkSet, Self::Error>;

    fn save(&self, bookmarks: &BookmarkSet) -> Result<(), Self::Error>;
}
