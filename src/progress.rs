//! Progress reporting module for scan operations
//!
//! This module provides data structures and utilities for reporting
//! scan progress to external callers via stderr, one JSON object per line.

use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::ScanRequest;
use crate::error::ScanError;
use crate::models::{ScanSummary, WalkPhase};

/// Start message sent when scan begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Scan root path
    pub root: String,
    /// Whether file contents are extracted
    pub extract: bool,
    /// Counted-file limit
    pub max_files: u64,
    /// Maximum depth for recursive scanning
    pub max_depth: usize,
    /// Files expected to be counted
    pub expected: u64,
}

impl StartMessage {
    /// Create a new start message
    pub fn new(seq: u64, ts: u64, request: &ScanRequest, expected: u64) -> Self {
        Self {
            msg_type: "start",
            seq,
            ts,
            root: request.root.to_string_lossy().to_string(),
            extract: request.extract_content,
            max_files: request.max_files,
            max_depth: request.max_depth,
            expected,
        }
    }
}

/// Progress message sent during scan
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Files counted so far
    #[serde(rename = "f")]
    pub files: u64,
    /// Files expected in total
    #[serde(rename = "t")]
    pub total: u64,
    /// Name of the last visited file
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl ProgressMessage {
    /// Create a new progress message
    pub fn new(seq: u64, ts: u64, files: u64, total: u64, name: String) -> Self {
        Self {
            msg_type: "p",
            seq,
            ts,
            files,
            total,
            name,
        }
    }
}

/// Error message sent when an error occurs during scan
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProgressMessage {
    /// Message type identifier ("err" for error)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Error type/category
    pub error_type: String,
    /// Error message description
    pub message: String,
    /// Path that caused the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorProgressMessage {
    /// Create a new error progress message
    pub fn new(seq: u64, ts: u64, error_type: String, message: String, path: Option<String>) -> Self {
        Self {
            msg_type: "err",
            seq,
            ts,
            error_type,
            message,
            path,
        }
    }
}

/// Done message sent when scan completes
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage {
    /// Message type identifier ("done" for completion)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Terminal phase of the walk
    pub phase: WalkPhase,
    /// Files counted toward the limit
    #[serde(rename = "vf")]
    pub visited_files: u64,
    /// Files extracted
    #[serde(rename = "ef")]
    pub extracted: u64,
    /// Files skipped
    #[serde(rename = "sf")]
    pub skipped: u64,
    /// Files that failed to read
    #[serde(rename = "rf")]
    pub read_errors: u64,
    /// Number of errors encountered
    #[serde(rename = "ec")]
    pub error_count: usize,
    /// Total scan duration in milliseconds
    pub ms: u64,
}

impl DoneMessage {
    /// Create a new done message from a finished walk
    pub fn new(seq: u64, ts: u64, summary: &ScanSummary) -> Self {
        Self {
            msg_type: "done",
            seq,
            ts,
            phase: summary.phase,
            visited_files: summary.visited_files,
            extracted: summary.extracted,
            skipped: summary.skipped,
            read_errors: summary.read_errors,
            error_count: summary.error_count(),
            ms: summary.duration_ms,
        }
    }
}

/// Progress reporter for outputting scan progress to stderr
///
/// Manages sequence numbers, timing and rate limiting of progress lines.
/// Start, error and done messages are never rate limited.
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Reporting interval in milliseconds
    interval_ms: u64,
    /// Last report time
    last_report: std::cell::Cell<Option<Instant>>,
    /// Sequence number for messages
    seq: AtomicU64,
    /// Start time of the reporter
    start_time: Instant,
}

impl ProgressReporter {
    /// Create a new ProgressReporter
    ///
    /// # Arguments
    /// * `enabled` - Whether progress reporting is enabled
    /// * `interval_ms` - Minimum interval between progress messages in milliseconds
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        Self {
            enabled,
            interval_ms,
            last_report: std::cell::Cell::new(None),
            seq: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Check if enough time has passed since the last progress line.
    /// The first progress line is always due.
    pub fn should_report(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_report.get() {
            Some(last) => last.elapsed().as_millis() as u64 >= self.interval_ms,
            None => true,
        }
    }

    /// Get the next sequence number (monotonically increasing)
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current timestamp in milliseconds since reporter creation
    pub fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Output a serializable message to stderr as JSON
    pub fn output_to_stderr<T: Serialize>(&self, msg: &T) {
        if let Ok(json) = serde_json::to_string(msg) {
            eprintln!("{}", json);
            std::io::stderr().flush().ok();
        }
    }

    /// Report scan start
    pub fn report_start(&self, request: &ScanRequest, expected: u64) {
        if !self.enabled {
            return;
        }
        let msg = StartMessage::new(self.next_seq(), self.current_timestamp(), request, expected);
        self.output_to_stderr(&msg);
    }

    /// Report scan progress.
    /// Returns true if a message was actually sent (respects interval timing).
    pub fn report_progress(&self, files: u64, total: u64, name: &str) -> bool {
        if !self.should_report() {
            return false;
        }
        let msg = ProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            files,
            total,
            name.to_string(),
        );
        self.output_to_stderr(&msg);
        self.last_report.set(Some(Instant::now()));
        true
    }

    /// Report an error during scan, ignoring interval timing
    pub fn report_error(&self, error: &ScanError) {
        if !self.enabled {
            return;
        }
        let msg = ErrorProgressMessage::new(
            self.next_seq(),
            self.current_timestamp(),
            format!("{:?}", error.kind),
            error.message.clone(),
            error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        );
        self.output_to_stderr(&msg);
    }

    /// Report scan completion
    pub fn report_done(&self, summary: &ScanSummary) {
        if !self.enabled {
            return;
        }
        let msg = DoneMessage::new(self.next_seq(), self.current_timestamp(), summary);
        self.output_to_stderr(&msg);
    }

    /// Check if the reporter is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
