//! The lazily materialized directory tree.
//!
//! Every expanded directory owns a [`ResourceCache`]. A directory's
//! children exist only after it was expanded at least once; collapsing
//! keeps the cache so the next expand re-diffs against it instead of
//! rebuilding from scratch.
//!
//! ```text
//! /d            (root, always expanded)
//! ├── sub/      expanded ─▶ cache for /d/sub
//! │   └── x.txt
//! ├── a.txt
//! └── b.txt
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use vigil_core::{IdentityKey, ResourceId, Snapshot};

use crate::cache::{ResourceCache, Row};
use crate::events::ViewChange;
use crate::registry::ViewHandle;

#[derive(Debug)]
struct DirNode {
    cache: ResourceCache,
    expanded: bool,
}

impl DirNode {
    fn new(path: &Path) -> Self {
        Self {
            cache: ResourceCache::new(ResourceId::Directory(path.to_path_buf())),
            expanded: true,
        }
    }
}

/// Directory caches keyed by directory path, rooted at one directory.
#[derive(Debug)]
pub struct DirectoryTree {
    root: PathBuf,
    nodes: HashMap<PathBuf, DirNode>,
}

impl DirectoryTree {
    pub fn new(root: PathBuf) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), DirNode::new(&root));
        Self { root, nodes }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-roots the tree, dropping every cache. Returns the old root.
    pub fn set_root(&mut self, root: PathBuf) -> PathBuf {
        self.nodes.clear();
        self.nodes.insert(root.clone(), DirNode::new(&root));
        std::mem::replace(&mut self.root, root)
    }

    /// Marks `dir` expanded, creating its cache on first expand.
    ///
    /// Returns the resource to acquire. A previously collapsed directory
    /// keeps its cache, so its old children show until the refresh lands.
    pub fn expand(&mut self, dir: &Path) -> ResourceId {
        self.nodes
            .entry(dir.to_path_buf())
            .and_modify(|node| node.expanded = true)
            .or_insert_with(|| DirNode::new(dir));
        ResourceId::Directory(dir.to_path_buf())
    }

    /// Hides the children of `dir`. The root cannot be collapsed.
    ///
    /// Returns `true` if the directory was expanded.
    pub fn collapse(&mut self, dir: &Path) -> bool {
        if dir == self.root {
            return false;
        }
        match self.nodes.get_mut(dir) {
            Some(node) if node.expanded => {
                node.expanded = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_expanded(&self, dir: &Path) -> bool {
        self.nodes.get(dir).is_some_and(|node| node.expanded)
    }

    /// True when `dir` has a cache, expanded or not.
    pub fn contains(&self, dir: &Path) -> bool {
        self.nodes.contains_key(dir)
    }

    pub fn cache(&self, dir: &Path) -> Option<&ResourceCache> {
        self.nodes.get(dir).map(|node| &node.cache)
    }

    /// Resolves an entry by identity through its parent directory's cache.
    pub fn lookup(&self, key: &IdentityKey) -> Option<&ViewHandle> {
        let parent = key.as_path().parent()?;
        self.nodes.get(parent)?.cache.lookup(key)
    }

    /// Applies a snapshot of `dir`.
    ///
    /// Returns `None` when the directory is no longer part of the tree or
    /// the snapshot is stale. Subdirectories that disappeared, or turned
    /// into files, lose their caches.
    pub fn apply(
        &mut self,
        dir: &Path,
        seq: u64,
        snapshot: Arc<Snapshot>,
    ) -> Option<Vec<ViewChange>> {
        let Some(node) = self.nodes.get_mut(dir) else {
            debug!(dir = %dir.display(), seq, "Dropping snapshot for directory outside the tree");
            return None;
        };
        let changes = node.cache.apply(seq, snapshot)?;

        let gone: Vec<PathBuf> = changes
            .iter()
            .filter(|change| !matches!(change, ViewChange::Inserted(_)))
            .filter(|change| {
                self.lookup(change.key())
                    .map_or(true, |handle| !handle.kind().is_directory())
            })
            .map(|change| change.key().as_path().to_path_buf())
            .collect();
        for path in gone {
            self.prune(&path);
        }

        Some(changes)
    }

    /// Records a failed acquisition of `dir`.
    ///
    /// Returns `false` when the failure is stale or the directory left the
    /// tree, in which case the caller should ignore it.
    pub fn accept_failure(&mut self, dir: &Path, seq: u64) -> bool {
        self.nodes
            .get_mut(dir)
            .is_some_and(|node| node.cache.accept(seq))
    }

    /// Drops the caches of `dir` and every directory below it.
    pub fn prune(&mut self, dir: &Path) {
        if dir == self.root {
            return;
        }
        let before = self.nodes.len();
        self.nodes.retain(|path, _| !path.starts_with(dir));
        let pruned = before - self.nodes.len();
        if pruned > 0 {
            debug!(dir = %dir.display(), pruned, "Pruned directory caches");
        }
    }

    /// Expanded directories reachable from the root, parents first.
    pub fn visible_directories(&self) -> Vec<PathBuf> {
        let mut out = vec![self.root.clone()];
        let mut i = 0;
        while let Some(dir) = out.get(i).cloned() {
            if let Some(node) = self.nodes.get(&dir) {
                for handle in node.cache.handles() {
                    let child = handle.key().as_path();
                    if handle.kind().is_directory() && self.is_expanded(child) {
                        out.push(child.to_path_buf());
                    }
                }
            }
            i += 1;
        }
        out
    }

    /// The materialized tree, depth-first, excluding the root itself.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        self.push_rows(&self.root, 0, &mut rows);
        rows
    }

    fn push_rows(&self, dir: &Path, depth: usize, rows: &mut Vec<Row>) {
        let Some(node) = self.nodes.get(dir) else {
            return;
        };
        for handle in node.cache.handles() {
            let path = handle.key().as_path();
            let expanded = handle.kind().is_directory() && self.is_expanded(path);
            rows.push(Row::from_handle(handle, depth, expanded));
            if expanded {
                self.push_rows(path, depth + 1, rows);
            }
        }
    }
}
