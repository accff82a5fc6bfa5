//! Auto-indexing lifecycle: a strictly monotonic state machine with
//! completion signalling for queries that need to wait.

use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::LciError;
use crate::index::scan::{build_index, collect_files, ScanConfig};
use crate::index::CodeIndex;

/// Indexing lifecycle states. Transitions are strictly monotonic:
/// `idle → scanning → indexing → completed | failed`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexingState {
    Idle,
    Scanning,
    Indexing,
    Completed,
    Failed,
}

impl IndexingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Indexing => "indexing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug)]
struct Inner {
    state: IndexingState,
    error: Option<String>,
}

/// Coordinates the background index build. Constructed once per server;
/// torn down with it. Queries observe the current state and decide whether
/// to proceed, report not-ready, or wait.
#[derive(Debug)]
pub struct AutoIndexManager {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl AutoIndexManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: IndexingState::Idle,
                error: None,
            }),
            cond: Condvar::new(),
        })
    }

    pub fn state(&self) -> IndexingState {
        self.inner.lock().expect("state lock").state
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().expect("state lock").error.clone()
    }

    /// Advance the state machine. Backward transitions are ignored so the
    /// lifecycle stays monotonic even under racing callers.
    fn advance(&self, next: IndexingState, error: Option<String>) {
        let mut inner = self.inner.lock().expect("state lock");
        if inner.state.is_terminal() || next <= inner.state {
            return;
        }
        inner.state = next;
        if let Some(e) = error {
            inner.error = Some(e);
        }
        drop(inner);
        self.cond.notify_all();
    }

    /// Block until a terminal state or the timeout elapses. Timing out
    /// returns an error and leaves the state untouched.
    pub fn wait_for_completion(
        &self,
        timeout: Duration,
    ) -> Result<(IndexingState, Option<String>), LciError> {
        let start = Instant::now();
        let mut inner = self.inner.lock().expect("state lock");
        while !inner.state.is_terminal() {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(LciError::Timeout {
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            let (guard, wait_result) = self
                .cond
                .wait_timeout(inner, timeout - elapsed)
                .expect("state lock");
            inner = guard;
            if wait_result.timed_out() && !inner.state.is_terminal() {
                return Err(LciError::Timeout {
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
        }
        Ok((inner.state, inner.error.clone()))
    }

    /// Spawn the background build and publish the finished generation into
    /// `index`. Called once at server creation.
    pub fn start(
        self: &Arc<Self>,
        index: Arc<RwLock<CodeIndex>>,
        config: ScanConfig,
        cancel: CancelToken,
    ) {
        let manager = Arc::clone(self);
        std::thread::spawn(move || {
            let build_start = Instant::now();

            manager.advance(IndexingState::Scanning, None);
            let files = match collect_files(&config) {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, "Index scan failed");
                    manager.advance(IndexingState::Failed, Some(e.to_string()));
                    return;
                }
            };
            info!(files = files.len(), dir = %config.dir, "Scan complete, indexing");

            manager.advance(IndexingState::Indexing, None);
            let built = match build_index(&config, &files, &cancel) {
                Ok(idx) => idx,
                Err(e) => {
                    warn!(error = %e, "Index build failed");
                    manager.advance(IndexingState::Failed, Some(e.to_string()));
                    return;
                }
            };

            let symbol_count = built.symbols.len();
            let file_count = built.files.len();
            match index.write() {
                Ok(mut guard) => {
                    let next_generation = guard.generation + 1;
                    *guard = built;
                    guard.generation = next_generation;
                }
                Err(e) => {
                    manager.advance(IndexingState::Failed, Some(format!("index lock poisoned: {}", e)));
                    return;
                }
            }

            info!(
                elapsed_ms = format_args!("{:.1}", build_start.elapsed().as_secs_f64() * 1000.0),
                files = file_count,
                symbols = symbol_count,
                "Index ready (background build complete)"
            );
            manager.advance(IndexingState::Completed, None);
        });
    }
}
