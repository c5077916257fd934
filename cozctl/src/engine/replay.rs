//! Replay engine: feeds previously recorded experiments through a session.
//!
//! Useful for exercising the control path and the polling client without a
//! live sampling agent. The input is a JSON array of experiment records:
//!
//! ```json
//! [{"class_sig": "com/app/Worker", "line_no": 42, "speedup": 0.25,
//!   "duration": 5000000000, "points_hit": 120}]
//! ```

use super::Engine;
use crate::domain::{EngineError, ProgressPoint, Scope, SinkError};
use crate::session::ExperimentSink;
use anyhow::{Context, Result};
use cozctl_common::ExperimentRecord;
use log::{debug, info};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Engine error code: `start_session` while already replaying
pub const REPLAY_ALREADY_RUNNING: i32 = -1;

/// Engine error code: the replay thread could not be spawned
pub const REPLAY_SPAWN_FAILED: i32 = -2;

/// Engine error code: the replay thread panicked
pub const REPLAY_THREAD_PANICKED: i32 = -3;

struct ReplayRun {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<usize>,
}

/// Engine that emits a fixed list of experiments at a steady pace.
pub struct ReplayEngine {
    records: Arc<Vec<ExperimentRecord>>,
    pace: Duration,
    warmup: Duration,
    ignored: Vec<Scope>,
    run: Option<ReplayRun>,
}

impl ReplayEngine {
    #[must_use]
    pub fn new(records: Vec<ExperimentRecord>, pace: Duration) -> Self {
        Self { records: Arc::new(records), pace, warmup: Duration::ZERO, ignored: Vec::new(), run: None }
    }

    /// Load records from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a JSON array of
    /// experiment records.
    pub fn from_file(path: impl AsRef<Path>, pace: Duration) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let records: Vec<ExperimentRecord> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid replay file {}", path.display()))?;
        info!("loaded {} experiments from {}", records.len(), path.display());
        Ok(Self::new(records, pace))
    }

    /// Skip experiments in these packages even when they are inside the scope.
    #[must_use]
    pub fn with_ignored(mut self, ignored: Vec<Scope>) -> Self {
        self.ignored = ignored;
        self
    }

    /// Hold back the first experiment of every run for `warmup`.
    #[must_use]
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_replaying(&self) -> bool {
        self.run.as_ref().is_some_and(|run| !run.handle.is_finished())
    }
}

impl Engine for ReplayEngine {
    fn start_session(
        &mut self,
        _point: &ProgressPoint,
        scope: &Scope,
        sink: ExperimentSink,
    ) -> Result<(), EngineError> {
        if self.run.is_some() {
            return Err(EngineError::new(REPLAY_ALREADY_RUNNING, "replay already in progress"));
        }

        let selected: Vec<ExperimentRecord> = self
            .records
            .iter()
            .filter(|r| scope.contains_class(&r.class_sig))
            .filter(|r| !self.ignored.iter().any(|ignored| ignored.contains_class(&r.class_sig)))
            .cloned()
            .collect();
        debug!("replaying {} of {} experiments in scope {scope}", selected.len(), self.records.len());

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let (pace, warmup) = (self.pace, self.warmup);
        let handle = std::thread::Builder::new()
            .name("cozctl-replay".to_string())
            .spawn(move || replay(&selected, &sink, &thread_stop, warmup, pace))
            .map_err(|e| EngineError::new(REPLAY_SPAWN_FAILED, e.to_string()))?;

        self.run = Some(ReplayRun { stop, handle });
        Ok(())
    }

    fn stop_session(&mut self) -> Result<(), EngineError> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };
        run.stop.store(true, Ordering::Release);
        run.handle.thread().unpark();
        match run.handle.join() {
            Ok(sent) => {
                debug!("replay thread stopped after {sent} experiments");
                Ok(())
            }
            Err(_) => Err(EngineError::new(REPLAY_THREAD_PANICKED, "replay thread panicked")),
        }
    }
}

/// Wait out `warmup`, then emit `records` one per `pace` until exhausted or
/// `stop` is set.
fn replay(
    records: &[ExperimentRecord],
    sink: &ExperimentSink,
    stop: &AtomicBool,
    warmup: Duration,
    pace: Duration,
) -> usize {
    let warm_at = Instant::now() + warmup;
    loop {
        if stop.load(Ordering::Acquire) {
            return 0;
        }
        let now = Instant::now();
        if now >= warm_at {
            break;
        }
        std::thread::park_timeout(warm_at - now);
    }

    let mut sent = 0;
    for record in records {
        // park_timeout wakes early on unpark from stop_session
        std::thread::park_timeout(pace);
        if stop.load(Ordering::Acquire) {
            break;
        }
        match sink.record(record.clone()) {
            Ok(()) => sent += 1,
            Err(SinkError::SessionEnded) => break,
            Err(e @ SinkError::ClassSigTooLong(_)) => debug!("skipping replayed experiment: {e}"),
        }
    }
    sent
}
