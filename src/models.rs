//! Core data models for the digester

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::ScanError;

/// Why or how a visited entity was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The tree listing of the whole root
    Structure,
    /// Text content was read and decoded
    Extracted,
    /// Content extraction was switched off
    NoContentRequested,
    /// Extension is a known binary/opaque format
    SkippedBinaryExt,
    /// File exceeds the extraction size limit
    SkippedOversize,
    /// Guessed media type is not text
    SkippedNonText,
    /// No media type guess and no text extension
    SkippedUnknownType,
    /// The file could not be read or decoded
    ReadError,
}

impl OutcomeKind {
    /// Whether this outcome increments the visited-file counter
    pub fn counts_toward_limit(&self) -> bool {
        matches!(
            self,
            OutcomeKind::Extracted | OutcomeKind::NoContentRequested | OutcomeKind::ReadError
        )
    }

    /// Whether this outcome is one of the four skip kinds
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            OutcomeKind::SkippedBinaryExt
                | OutcomeKind::SkippedOversize
                | OutcomeKind::SkippedNonText
                | OutcomeKind::SkippedUnknownType
        )
    }

    /// User-facing note shown next to skipped or failed entries
    pub fn note(&self) -> Option<&'static str> {
        match self {
            OutcomeKind::SkippedBinaryExt => Some("跳过该文件类型"),
            OutcomeKind::SkippedOversize => Some("文件过大，已跳过"),
            OutcomeKind::SkippedNonText => Some("非文本文件，已跳过"),
            OutcomeKind::SkippedUnknownType => Some("无法确定文件类型，已跳过"),
            _ => None,
        }
    }

    /// Label prefix for tree views ("跳过: " / "错误: ")
    pub fn label_prefix(&self) -> &'static str {
        if self.is_skip() {
            "跳过: "
        } else if *self == OutcomeKind::ReadError {
            "错误: "
        } else {
            ""
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Structure => "structure",
            OutcomeKind::Extracted => "extracted",
            OutcomeKind::NoContentRequested => "no_content_requested",
            OutcomeKind::SkippedBinaryExt => "skipped_binary_ext",
            OutcomeKind::SkippedOversize => "skipped_oversize",
            OutcomeKind::SkippedNonText => "skipped_non_text",
            OutcomeKind::SkippedUnknownType => "skipped_unknown_type",
            OutcomeKind::ReadError => "read_error",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One emitted result: the tree listing or a single visited file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Display name (file name, or root name for the structure)
    pub name: String,
    /// Decoded text, the tree listing, or a read diagnostic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Outcome classification
    pub kind: OutcomeKind,
    /// Absolute path of the entity
    pub path: PathBuf,
}

impl ScanOutcome {
    /// Create an outcome
    pub fn new(name: impl Into<String>, content: Option<String>, kind: OutcomeKind, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            content,
            kind,
            path,
        }
    }

    /// Name as shown in a tree view
    pub fn display_name(&self) -> String {
        format!("{}{}", self.kind.label_prefix(), self.name)
    }
}

/// Box-drawing rendering of the scanned hierarchy, one line per entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeListing {
    /// Lines in pre-order; the first line is the root name
    pub lines: Vec<String>,
}

impl TreeListing {
    /// Connector for a sibling that is followed by another
    pub const BRANCH: &'static str = "├── ";
    /// Connector for the last sibling
    pub const LAST: &'static str = "└── ";
    /// Continuation below a non-last sibling
    pub const PIPE: &'static str = "│   ";
    /// Continuation below the last sibling
    pub const BLANK: &'static str = "    ";

    /// Joined text of the listing
    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of listed entries, excluding the root line
    pub fn entry_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

impl fmt::Display for TreeListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Lifecycle of a single walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalkPhase {
    /// Created, not yet started
    #[default]
    Idle,
    /// Walk in progress
    Scanning,
    /// Every reachable file was visited
    Completed,
    /// Stopped by a cancel request or the file limit
    Cancelled,
}

impl WalkPhase {
    /// Whether the walk has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, WalkPhase::Completed | WalkPhase::Cancelled)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WalkPhase::Idle => "idle",
            WalkPhase::Scanning => "scanning",
            WalkPhase::Completed => "completed",
            WalkPhase::Cancelled => "cancelled",
        }
    }
}

/// Totals of a finished walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Root that was walked
    pub root: PathBuf,
    /// Terminal state of the walk
    pub phase: WalkPhase,
    /// Entries in the tree listing, excluding the root line
    pub listed_entries: u64,
    /// Files counted toward the limit
    pub visited_files: u64,
    /// Files whose text was extracted
    pub extracted: u64,
    /// Files reported without content
    pub no_content: u64,
    /// Files skipped by classification
    pub skipped: u64,
    /// Files that could not be read or decoded
    pub read_errors: u64,
    /// Non-fatal errors encountered during the walk
    #[serde(skip)]
    pub errors: Vec<ScanError>,
    /// Wall-clock start of the walk
    pub started_at: DateTime<Utc>,
    /// Total walk duration in milliseconds
    pub duration_ms: u64,
}

impl ScanSummary {
    /// Create an empty summary for a root
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            phase: WalkPhase::Idle,
            listed_entries: 0,
            visited_files: 0,
            extracted: 0,
            no_content: 0,
            skipped: 0,
            read_errors: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Account for one emitted file outcome
    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Extracted => self.extracted += 1,
            OutcomeKind::NoContentRequested => self.no_content += 1,
            OutcomeKind::ReadError => self.read_errors += 1,
            k if k.is_skip() => self.skipped += 1,
            _ => {}
        }
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Event delivered from a walk to its consumer
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A structure or per-file outcome
    Outcome(ScanOutcome),
    /// Visited-file counter after an increment
    Progress(u64),
    /// Terminal event, always the last one of a walk
    Finished(ScanSummary),
}

impl ScanEvent {
    /// Whether this is the terminal event
    pub fn is_finished(&self) -> bool {
        matches!(self, ScanEvent::Finished(_))
    }
}
