//! JSON-file bookmark persistence.
//!
//! The file holds a JSON array of paths. Writes go to a sibling temp file
//! and are renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use vigil_core::{BookmarkSet, BookmarkStore};

use crate::error::TuiError;

#[derive(Debug, Clone)]
pub struct JsonBookmarkStore {
    path: PathBuf,
}

impl JsonBookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> TuiError {
        TuiError::Bookmarks {
            path: self.path.clone(),
            source,
        }
    }
}

impl BookmarkStore for JsonBookmarkStore {
    type Error = TuiError;

    /// A missing file is an empty set.
    fn load(&self) -> Result<BookmarkSet, TuiError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No bookmarks file");
                return Ok(BookmarkSet::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let bookmarks: BookmarkSet = serde_json::from_str(&text)?;
        info!(path = %self.path.display(), count = bookmarks.len(), "Loaded bookmarks");
        Ok(bookmarks)
    }

    fn save(&self, bookmarks: &BookmarkSet) -> Result<(), TuiError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(bookmarks)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), count = bookmarks.len(), "Saved bookmarks");
        Ok(())
    }
}
