//! Directory structure and text content digester
//!
//! This library walks a file or directory within depth and file-count
//! limits, renders a box-drawing tree of it, classifies every file and
//! reads the textual ones, streaming the results as events from a
//! background thread.

pub mod classifier;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod preferences;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod transcript;
pub mod tree;

pub use classifier::{classify, classify_file};
pub use config::ScanRequest;
pub use decode::{DecodeChain, TextDecoder};
pub use error::{ScanError, ScanErrorKind};
pub use models::{OutcomeKind, ScanEvent, ScanOutcome, ScanSummary, TreeListing, WalkPhase};
pub use preferences::{PreferencesStore, Theme};
pub use progress::{DoneMessage, ErrorProgressMessage, ProgressMessage, ProgressReporter, StartMessage};
pub use scanner::{walk, ScanSink, ScanState, Walker};
pub use session::{ScanSession, ScanStart};
pub use transcript::Transcript;
pub use tree::Snapshot;
