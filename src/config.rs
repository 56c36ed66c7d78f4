//! Scan request configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default cap on files that count toward the scan limit
pub const DEFAULT_MAX_FILES: u64 = 1000;

/// Default max depth for recursive scanning
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Files larger than this (10 MiB) are never read as text
pub const MAX_TEXT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Parameters of a single scan, immutable once the scan starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// File or directory to scan
    pub root: PathBuf,

    /// Whether file contents are read and decoded
    pub extract_content: bool,

    /// Maximum number of counted files (extracted, no-content or unreadable)
    pub max_files: u64,

    /// Maximum directory nesting below the root that is descended into.
    /// Children of the root are at level 0.
    pub max_depth: usize,

    /// Directory names that are neither listed nor walked
    #[serde(default)]
    pub ignore_dirs: BTreeSet<String>,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            extract_content: true,
            max_files: DEFAULT_MAX_FILES,
            max_depth: DEFAULT_MAX_DEPTH,
            ignore_dirs: BTreeSet::new(),
        }
    }
}

impl ScanRequest {
    /// Create a request for the given root with default limits
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Create a request builder
    pub fn builder() -> ScanRequestBuilder {
        ScanRequestBuilder::new()
    }

    /// Directory names commonly excluded from source trees
    pub fn default_ignore_dirs() -> BTreeSet<String> {
        [
            ".git",
            "node_modules",
            "__pycache__",
            ".vscode",
            ".idea",
            "dist",
            "build",
            "out",
            "target",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Check if a directory should be ignored
    pub fn should_ignore_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }

    /// Depth limit in walkdir terms, where the root itself is depth 0.
    ///
    /// Entries of a directory at level `n` sit at walkdir depth `n + 1`,
    /// so the deepest listed entries are at `max_depth + 1`.
    pub fn walk_depth(&self) -> usize {
        self.max_depth.saturating_add(1)
    }

    /// Same request pointed at another root
    pub fn with_root(&self, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..self.clone()
        }
    }
}

/// Builder for ScanRequest
#[derive(Debug, Default)]
pub struct ScanRequestBuilder {
    request: ScanRequest,
}

impl ScanRequestBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root path
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.request.root = root.into();
        self
    }

    /// Enable or disable content extraction
    pub fn extract_content(mut self, enabled: bool) -> Self {
        self.request.extract_content = enabled;
        self
    }

    /// Set the counted-file limit
    pub fn max_files(mut self, max_files: u64) -> Self {
        self.request.max_files = max_files;
        self
    }

    /// Set the maximum depth for recursive scanning
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.request.max_depth = depth;
        self
    }

    /// Set the directories to ignore
    pub fn ignore_dirs(mut self, dirs: BTreeSet<String>) -> Self {
        self.request.ignore_dirs = dirs;
        self
    }

    /// Add a directory to ignore
    pub fn add_ignore_dir(mut self, dir: impl Into<String>) -> Self {
        self.request.ignore_dirs.insert(dir.into());
        self
    }

    /// Build the request
    pub fn build(self) -> ScanRequest {
        self.request
    }
}
