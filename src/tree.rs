//! Directory snapshot and tree listing
//!
//! A scan enumerates the filesystem once. The resulting [`Snapshot`] feeds
//! the tree listing, the pre-flight count and the per-file pass, so the
//! three always describe the same entries.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classifier::classify_file;
use crate::config::ScanRequest;
use crate::error::ScanError;
use crate::models::TreeListing;
use crate::scanner::ScanState;

/// Kind of a snapshot entry, symlinks are never followed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    Other,
}

/// One enumerated filesystem entry
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    /// File name as listed
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Depth below the root (root is 0)
    pub depth: usize,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes for regular files, 0 otherwise
    pub size: u64,
    /// Child indices in enumeration order
    pub children: Vec<usize>,
}

/// Pre-order record of everything reachable under a root
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    root: PathBuf,
    entries: Vec<SnapshotEntry>,
    errors: Vec<ScanError>,
}

impl Snapshot {
    /// Enumerate `request.root`, honoring the depth limit and ignored
    /// directories. Stops early once `state` is cancelled.
    ///
    /// Directories that cannot be read are kept as empty entries and the
    /// failure is recorded in [`Snapshot::errors`].
    pub fn collect(request: &ScanRequest, state: &ScanState) -> Self {
        let mut snapshot = Snapshot {
            root: request.root.clone(),
            ..Default::default()
        };
        // Index of the most recent entry at each depth
        let mut stack: Vec<usize> = Vec::new();

        let walker = WalkDir::new(&request.root)
            .max_depth(request.walk_depth())
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                !(e.depth() > 0
                    && e.file_type().is_dir()
                    && request.should_ignore_dir(&e.file_name().to_string_lossy()))
            });

        for entry in walker {
            if state.is_cancelled() {
                log::debug!("Enumeration of {:?} cancelled", request.root);
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let err = ScanError::from_walk(&e);
                    log::error!("Cannot access {:?}: {}", err.path, e);
                    snapshot.errors.push(err);
                    continue;
                }
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };

            let size = if kind == EntryKind::File {
                match entry.metadata() {
                    Ok(m) => m.len(),
                    Err(e) => {
                        log::warn!("Cannot stat {:?}: {}", entry.path(), e);
                        0
                    }
                }
            } else {
                0
            };

            let depth = entry.depth();
            let idx = snapshot.entries.len();
            snapshot.entries.push(SnapshotEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path().to_path_buf(),
                depth,
                kind,
                size,
                children: Vec::new(),
            });

            stack.truncate(depth);
            if let Some(&parent) = stack.last() {
                snapshot.entries[parent].children.push(idx);
            }
            stack.push(idx);
        }

        snapshot
    }

    /// Root path of the snapshot
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Display name of the root
    pub fn root_name(&self) -> String {
        root_display_name(&self.root)
    }

    /// All entries in pre-order; index 0 is the root when it was readable
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Regular files in pre-order
    pub fn files(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::File)
    }

    /// Errors met while enumerating
    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    /// Take ownership of the enumeration errors
    pub fn take_errors(&mut self) -> Vec<ScanError> {
        std::mem::take(&mut self.errors)
    }

    /// Whether nothing was enumerated (root missing or unreadable)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Files that will count toward the file limit, capped at `max_files`
    pub fn eligible_count(&self, request: &ScanRequest) -> u64 {
        use rayon::prelude::*;

        let files: Vec<&SnapshotEntry> = self.files().collect();
        let eligible = files
            .par_iter()
            .filter(|f| classify_file(&f.name, f.size, request.extract_content).counts_toward_limit())
            .count() as u64;
        eligible.min(request.max_files)
    }

    /// Render the indented tree listing
    pub fn render(&self) -> TreeListing {
        let mut lines = vec![self.root_name()];
        if let Some(root) = self.entries.first() {
            if root.kind == EntryKind::Dir {
                self.render_children(0, "", &mut lines);
            }
        }
        TreeListing { lines }
    }

    fn render_children(&self, idx: usize, prefix: &str, lines: &mut Vec<String>) {
        let children = &self.entries[idx].children;
        for (i, &child) in children.iter().enumerate() {
            let is_last = i + 1 == children.len();
            let entry = &self.entries[child];
            let connector = if is_last { TreeListing::LAST } else { TreeListing::BRANCH };
            lines.push(format!("{}{}{}", prefix, connector, entry.name));
            if entry.kind == EntryKind::Dir {
                let extension = if is_last { TreeListing::BLANK } else { TreeListing::PIPE };
                self.render_children(child, &format!("{}{}", prefix, extension), lines);
            }
        }
    }
}

/// Root display name: the last path component, or the whole path for `/` and the like
pub fn root_display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
