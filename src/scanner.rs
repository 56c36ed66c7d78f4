//! Scanner module - the background walk that classifies and reads files
//!
//! A walk renders the tree listing first, then visits every regular file
//! of the same snapshot in enumeration order, emitting one outcome per
//! file and a final `Finished` event no matter how the walk ends.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::classifier::classify_file;
use crate::config::ScanRequest;
use crate::decode::DecodeChain;
use crate::error::ScanError;
use crate::models::{OutcomeKind, ScanEvent, ScanOutcome, ScanSummary, WalkPhase};
use crate::tree::{Snapshot, SnapshotEntry};

#[derive(Debug, Default)]
struct StateInner {
    visited: u64,
    cancelled: bool,
    phase: WalkPhase,
}

/// Shared walk state: visited-file counter, cancel flag and lifecycle phase.
///
/// One lock guards all three; it is held only for a check or an increment,
/// never across filesystem I/O.
#[derive(Debug, Default)]
pub struct ScanState {
    inner: Mutex<StateInner>,
}

impl ScanState {
    /// Create a fresh, idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; safe to call at any time, any number of times
    pub fn cancel(&self) {
        self.inner.lock().cancelled = true;
    }

    /// Whether cancellation was requested or the limit was reached
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Files counted so far
    pub fn visited(&self) -> u64 {
        self.inner.lock().visited
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> WalkPhase {
        self.inner.lock().phase
    }

    /// Move from `Idle` to `Scanning`. Returns false if this state was used before.
    fn begin(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != WalkPhase::Idle {
            return false;
        }
        inner.phase = WalkPhase::Scanning;
        true
    }

    /// Check the flag and the limit together; hitting the limit cancels.
    fn should_stop(&self, max_files: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.visited >= max_files {
            inner.cancelled = true;
        }
        inner.cancelled
    }

    /// Count one file and return the new total; reaching the limit cancels.
    fn increment(&self, max_files: u64) -> u64 {
        let mut inner = self.inner.lock();
        inner.visited += 1;
        if inner.visited >= max_files {
            inner.cancelled = true;
        }
        inner.visited
    }

    /// Settle the terminal phase and return it
    fn finish(&self) -> WalkPhase {
        let mut inner = self.inner.lock();
        inner.phase = if inner.cancelled {
            WalkPhase::Cancelled
        } else {
            WalkPhase::Completed
        };
        inner.phase
    }
}

/// Receiver of walk events
pub trait ScanSink {
    /// A structure or per-file outcome
    fn on_outcome(&mut self, outcome: ScanOutcome);

    /// Visited-file counter after an increment
    fn on_progress(&mut self, count: u64);

    /// Terminal event, called exactly once per walk
    fn on_finished(&mut self, summary: ScanSummary);
}

impl ScanSink for Vec<ScanEvent> {
    fn on_outcome(&mut self, outcome: ScanOutcome) {
        self.push(ScanEvent::Outcome(outcome));
    }

    fn on_progress(&mut self, count: u64) {
        self.push(ScanEvent::Progress(count));
    }

    fn on_finished(&mut self, summary: ScanSummary) {
        self.push(ScanEvent::Finished(summary));
    }
}

impl ScanSink for Sender<ScanEvent> {
    // A dropped receiver only means nobody is listening any more
    fn on_outcome(&mut self, outcome: ScanOutcome) {
        let _ = self.send(ScanEvent::Outcome(outcome));
    }

    fn on_progress(&mut self, count: u64) {
        let _ = self.send(ScanEvent::Progress(count));
    }

    fn on_finished(&mut self, summary: ScanSummary) {
        let _ = self.send(ScanEvent::Finished(summary));
    }
}

/// A single-use walk over one request
pub struct Walker {
    request: ScanRequest,
    state: Arc<ScanState>,
    decoders: DecodeChain,
}

impl Walker {
    /// Create a walker with the standard decoding chain
    pub fn new(request: ScanRequest) -> Self {
        Self {
            request,
            state: Arc::new(ScanState::new()),
            decoders: DecodeChain::standard(),
        }
    }

    /// Replace the decoding chain
    pub fn with_decoders(mut self, decoders: DecodeChain) -> Self {
        self.decoders = decoders;
        self
    }

    /// Share an existing state (and thus its cancel flag)
    pub fn with_state(mut self, state: Arc<ScanState>) -> Self {
        self.state = state;
        self
    }

    /// Handle for cancelling and observing the walk
    pub fn state(&self) -> Arc<ScanState> {
        Arc::clone(&self.state)
    }

    /// Enumerate the root and walk it
    pub fn walk<S: ScanSink>(self, sink: &mut S) -> WalkPhase {
        self.run(None, sink)
    }

    /// Walk a snapshot that was already enumerated for this request
    pub fn walk_snapshot<S: ScanSink>(self, snapshot: Snapshot, sink: &mut S) -> WalkPhase {
        self.run(Some(snapshot), sink)
    }

    /// Run the walk on a dedicated thread, streaming events over a channel
    pub fn spawn(
        self,
        snapshot: Option<Snapshot>,
    ) -> Result<(thread::JoinHandle<()>, Receiver<ScanEvent>), ScanError> {
        let (mut tx, rx) = crossbeam_channel::unbounded::<ScanEvent>();
        let root = self.request.root.clone();
        let handle = thread::Builder::new()
            .name("tree-digest-walker".into())
            .spawn(move || {
                self.run(snapshot, &mut tx);
            })
            .map_err(|e| ScanError::io_error(Some(root), format!("failed to spawn walker: {}", e)))?;
        Ok((handle, rx))
    }

    fn run<S: ScanSink>(self, snapshot: Option<Snapshot>, sink: &mut S) -> WalkPhase {
        let start = Instant::now();
        let mut summary = ScanSummary::new(self.request.root.clone());

        if !self.state.begin() {
            log::warn!("Walker for {:?} was already used", self.request.root);
            summary.phase = self.state.phase();
            sink.on_finished(summary);
            return self.state.phase();
        }

        log::info!("Walking {:?}", self.request.root);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.walk_inner(snapshot, sink, &mut summary)
        }));
        if let Err(payload) = outcome {
            let message = panic_message(&*payload);
            log::error!("Walk of {:?} failed: {}", self.request.root, message);
            summary
                .errors
                .push(ScanError::unexpected(Some(self.request.root.clone()), message));
            // Files may have been left unvisited
            self.state.cancel();
        }

        let phase = self.state.finish();
        summary.phase = phase;
        summary.visited_files = self.state.visited();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "Walk of {:?} {}: {} files visited in {}ms",
            self.request.root,
            phase.as_str(),
            summary.visited_files,
            summary.duration_ms
        );
        sink.on_finished(summary);
        phase
    }

    fn walk_inner<S: ScanSink>(
        &self,
        snapshot: Option<Snapshot>,
        sink: &mut S,
        summary: &mut ScanSummary,
    ) {
        let mut snapshot = match snapshot {
            Some(s) => s,
            None => Snapshot::collect(&self.request, &self.state),
        };
        summary.errors.extend(snapshot.take_errors());

        // Phase A: the listing always comes first, even after a cancel
        let listing = snapshot.render();
        summary.listed_entries = listing.entry_count() as u64;
        sink.on_outcome(ScanOutcome::new(
            snapshot.root_name(),
            Some(listing.as_text()),
            OutcomeKind::Structure,
            absolute(&self.request.root),
        ));

        // Phase B: files in enumeration order
        for file in snapshot.files() {
            if self.state.should_stop(self.request.max_files) {
                log::debug!("Stopping walk of {:?}", self.request.root);
                break;
            }

            let visited = panic::catch_unwind(AssertUnwindSafe(|| self.visit(file, summary)));
            let outcome = visited.unwrap_or_else(|payload| self.fault(file, &*payload, summary));
            let kind = outcome.kind;
            summary.record(kind);
            sink.on_outcome(outcome);

            if kind.counts_toward_limit() {
                let count = self.state.increment(self.request.max_files);
                sink.on_progress(count);
            }
        }
    }

    fn visit(&self, file: &SnapshotEntry, summary: &mut ScanSummary) -> ScanOutcome {
        let kind = classify_file(&file.name, file.size, self.request.extract_content);
        let path = absolute(&file.path);

        if kind != OutcomeKind::Extracted {
            if let Some(note) = kind.note() {
                log::debug!("{:?}: {}", path, note);
            }
            return ScanOutcome::new(file.name.clone(), None, kind, path);
        }

        let text = std::fs::read(&file.path)
            .map_err(|e| ScanError::from(e).with_path(path.clone()))
            .and_then(|bytes| self.decoders.decode(&path, &bytes));

        match text {
            Ok(content) => ScanOutcome::new(file.name.clone(), Some(content), kind, path),
            Err(err) => {
                log::error!("Cannot read {:?}: {}", path, err.message);
                let diagnostic = format!("无法读取 {}: {}", path.display(), err.message);
                summary.errors.push(err);
                ScanOutcome::new(file.name.clone(), Some(diagnostic), OutcomeKind::ReadError, path)
            }
        }
    }

    /// Outcome for a file whose visit panicked; the walk carries on with the next file
    fn fault(
        &self,
        file: &SnapshotEntry,
        payload: &(dyn std::any::Any + Send),
        summary: &mut ScanSummary,
    ) -> ScanOutcome {
        let path = absolute(&file.path);
        let message = panic_message(payload);
        log::error!("Unexpected fault while visiting {:?}: {}", path, message);
        let diagnostic = format!("无法读取 {}: {}", path.display(), message);
        summary.errors.push(ScanError::unexpected(Some(path.clone()), message));
        ScanOutcome::new(file.name.clone(), Some(diagnostic), OutcomeKind::ReadError, path)
    }
}

/// Walk a request on the calling thread, collecting every event
pub fn walk(request: ScanRequest) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    Walker::new(request).walk(&mut events);
    events
}

fn absolute(path: &std::path::Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
