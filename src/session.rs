//! Scan sessions - one active background walk at a time
//!
//! A session validates a request with a pre-flight count, then hands the
//! enumerated snapshot to a walker thread. Starting a new scan cancels and
//! joins the previous one first.

use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::ScanRequest;
use crate::error::ScanError;
use crate::models::ScanEvent;
use crate::scanner::{ScanState, Walker};
use crate::tree::Snapshot;

/// A scan that was accepted and is now running
#[derive(Debug)]
pub struct ScanStart {
    /// Files expected to count toward the limit (the progress maximum)
    pub expected: u64,
    /// Events of the walk, ending with `ScanEvent::Finished`
    pub events: Receiver<ScanEvent>,
}

struct Worker {
    state: Arc<ScanState>,
    handle: JoinHandle<()>,
}

/// Owner of at most one running walk
pub struct ScanSession {
    template: ScanRequest,
    worker: Option<Worker>,
    last_request: Option<ScanRequest>,
}

impl ScanSession {
    /// Create a session; `template` supplies limits and ignored directories
    pub fn new(template: ScanRequest) -> Self {
        Self {
            template,
            worker: None,
            last_request: None,
        }
    }

    /// Start scanning `path`, using the session's limits
    pub fn start(&mut self, path: impl Into<PathBuf>, extract_content: bool) -> Result<ScanStart, ScanError> {
        let root: PathBuf = path.into();
        let mut request = self.template.with_root(&root);
        request.extract_content = extract_content;
        self.start_request(request)
    }

    /// Start scanning with a fully specified request.
    ///
    /// Returns `NothingToScan` without starting a worker when no file is
    /// eligible, and `NotFound` when the root does not exist.
    pub fn start_request(&mut self, request: ScanRequest) -> Result<ScanStart, ScanError> {
        self.cancel();
        self.join();

        if std::fs::symlink_metadata(&request.root).is_err() {
            return Err(ScanError::not_found(request.root.clone()));
        }
        self.last_request = Some(request.clone());

        let state = Arc::new(ScanState::new());
        let snapshot = Snapshot::collect(&request, &state);
        let expected = snapshot.eligible_count(&request);
        if expected == 0 {
            log::info!("Nothing to scan under {:?}", request.root);
            return Err(ScanError::nothing_to_scan(request.root.clone()));
        }

        log::info!(
            "Starting scan of {:?} ({} eligible files)",
            request.root,
            expected
        );
        let walker = Walker::new(request).with_state(Arc::clone(&state));
        let (handle, events) = walker.spawn(Some(snapshot))?;
        self.worker = Some(Worker { state, handle });

        Ok(ScanStart { expected, events })
    }

    /// Rescan the last accepted root with the same parameters
    pub fn refresh(&mut self) -> Result<ScanStart, ScanError> {
        match self.last_request.clone() {
            Some(request) => self.start_request(request),
            None => Err(ScanError::nothing_to_scan(PathBuf::new())),
        }
    }

    /// Request cancellation of the running walk, if any
    pub fn cancel(&self) {
        if let Some(worker) = &self.worker {
            worker.state.cancel();
        }
    }

    /// Block until the running walk has sent its finished event
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.handle.join().is_err() {
                log::error!("Walker thread panicked outside the walk");
            }
        }
    }

    /// Whether a walk is still running
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    /// Request of the last accepted scan
    pub fn last_request(&self) -> Option<&ScanRequest> {
        self.last_request.as_ref()
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(ScanRequest::default())
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}
