//! # Session Control State Machine
//!
//! One [`SessionController`] exists per controlled process. It owns the
//! configuration (progress point, scope), the running flag, the experiment
//! buffer and the engine, all behind a single lock so that control calls
//! and buffer drains are totally ordered.
//!
//! ## States
//!
//! ```text
//!            set_progress_point / set_scope
//!   ┌──────┐ ───────────────────────────────▶ ┌───────┐
//!   │ IDLE │                                   │ READY │
//!   └──────┘                                   └───────┘
//!                                      start()  │    ▲  end()
//!                                               ▼    │
//!                                            ┌─────────┐
//!                                            │ RUNNING │
//!                                            └─────────┘
//! ```
//!
//! Illegal calls return a [`ControlError`] and never mutate state.

use super::buffer::ExperimentBuffer;
use super::sink::{run_queue, RunQueue};
use crate::domain::{ControlError, ProgressPoint, Scope};
use crate::engine::Engine;
use cozctl_common::ExperimentRecord;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fmt;

/// Observable lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Progress point or scope missing
    Idle,
    /// Fully configured, not running
    Ready,
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "IDLE",
            SessionState::Ready => "READY",
            SessionState::Running => "RUNNING",
        };
        f.write_str(name)
    }
}

struct Session<E> {
    progress_point: Option<ProgressPoint>,
    scope: Option<Scope>,
    running: bool,
    /// Set by the first successful start; enables drains after `end`
    has_run: bool,
    buffer: ExperimentBuffer,
    /// Queue of the current or most recent run
    queue: Option<RunQueue>,
    engine: E,
}

impl<E> Session<E> {
    /// Move everything the engine has queued into the buffer.
    fn collect_pending(&mut self) {
        if let Some(queue) = &self.queue {
            self.buffer.extend(queue.pending());
        }
    }

    fn state(&self) -> SessionState {
        if self.running {
            SessionState::Running
        } else if self.progress_point.is_some() && self.scope.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }
}

/// Finite-state machine governing configuration and lifecycle of a
/// profiling run.
pub struct SessionController<E: Engine> {
    session: Mutex<Session<E>>,
}

impl<E: Engine> SessionController<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            session: Mutex::new(Session {
                progress_point: None,
                scope: None,
                running: false,
                has_run: false,
                buffer: ExperimentBuffer::new(),
                queue: None,
                engine,
            }),
        }
    }

    /// Configure the line whose execution rate is measured.
    ///
    /// # Errors
    /// - [`ControlError::CannotCallWhenRunning`] while a run is active
    /// - [`ControlError::Engine`] if the engine rejects the location
    pub fn set_progress_point(&self, point: ProgressPoint) -> Result<(), ControlError> {
        let mut session = self.session.lock();
        if session.running {
            debug!("rejected progress point {point}: session is running");
            return Err(ControlError::CannotCallWhenRunning);
        }
        if let Err(e) = session.engine.validate_progress_point(&point) {
            warn!("engine rejected progress point {point}: {e}");
            return Err(e.into());
        }
        info!("progress point set to {point}");
        session.progress_point = Some(point);
        Ok(())
    }

    /// Configure the package that is virtually sped up.
    ///
    /// # Errors
    /// - [`ControlError::CannotCallWhenRunning`] while a run is active
    /// - [`ControlError::Engine`] if the engine rejects the scope
    pub fn set_scope(&self, scope: Scope) -> Result<(), ControlError> {
        let mut session = self.session.lock();
        if session.running {
            debug!("rejected scope {scope}: session is running");
            return Err(ControlError::CannotCallWhenRunning);
        }
        if let Err(e) = session.engine.validate_scope(&scope) {
            warn!("engine rejected scope {scope}: {e}");
            return Err(e.into());
        }
        info!("scope set to {scope}");
        session.scope = Some(scope);
        Ok(())
    }

    /// Start a run with the current configuration.
    ///
    /// Records left over from a previous run are discarded once the engine
    /// has started.
    ///
    /// # Errors
    /// - [`ControlError::NoProgressPointSet`] / [`ControlError::NoScopeSet`]
    ///   if configuration is incomplete (checked in that order)
    /// - [`ControlError::CannotCallWhenRunning`] if already running
    /// - [`ControlError::Engine`] if the engine fails to start
    pub fn start(&self) -> Result<(), ControlError> {
        let mut guard = self.session.lock();
        let session = &mut *guard;

        let Some(point) = session.progress_point.as_ref() else {
            debug!("start rejected: no progress point set");
            return Err(ControlError::NoProgressPointSet);
        };
        let Some(scope) = session.scope.as_ref() else {
            debug!("start rejected: no scope set");
            return Err(ControlError::NoScopeSet);
        };
        if session.running {
            debug!("start rejected: already running");
            return Err(ControlError::CannotCallWhenRunning);
        }

        let (sink, queue) = run_queue();
        if let Err(e) = session.engine.start_session(point, scope, sink) {
            warn!("engine failed to start: {e}");
            return Err(e.into());
        }

        info!("profiling started (progress point {point}, scope {scope})");
        session.running = true;
        session.has_run = true;
        session.buffer.clear();
        if let Some(stale) = session.queue.replace(queue) {
            stale.close();
        }
        Ok(())
    }

    /// End the current run.
    ///
    /// The session leaves RUNNING even if the engine reports a failure while
    /// stopping; the engine's error is still returned. Records produced
    /// before the stop remain available to [`drain_for_delivery`](Self::drain_for_delivery).
    ///
    /// # Errors
    /// - [`ControlError::ProfilerNotRunning`] if no run is active
    /// - [`ControlError::Engine`] if the engine reports a stop failure
    pub fn end(&self) -> Result<(), ControlError> {
        let mut session = self.session.lock();
        if !session.running {
            debug!("end rejected: profiler not running");
            return Err(ControlError::ProfilerNotRunning);
        }

        let result = session.engine.stop_session();
        session.running = false;
        if let Some(queue) = &session.queue {
            queue.close();
        }
        session.collect_pending();

        match result {
            Ok(()) => {
                info!("profiling ended ({} experiments awaiting delivery)", session.buffer.len());
                Ok(())
            }
            Err(e) => {
                warn!("engine reported an error while stopping: {e}");
                Err(e.into())
            }
        }
    }

    /// Atomically take every experiment produced since the last drain.
    ///
    /// Returns `None` if the session has never run and nothing is buffered.
    /// Otherwise returns the records in production order, possibly empty;
    /// an empty result means "nothing new", not failure.
    pub fn drain_for_delivery(&self) -> Option<Vec<ExperimentRecord>> {
        let mut session = self.session.lock();
        session.collect_pending();
        if !session.has_run && session.buffer.is_empty() {
            return None;
        }
        let records = session.buffer.take();
        if !records.is_empty() {
            debug!("delivering {} experiments", records.len());
        }
        Some(records)
    }

    /// Hand every undelivered experiment to `deliver`, removing them only
    /// if it succeeds.
    ///
    /// Returns `None` under the same condition as
    /// [`drain_for_delivery`](Self::drain_for_delivery). When `deliver` fails
    /// the records stay buffered, in order, for the next call.
    pub fn deliver_with<T, Err>(
        &self,
        deliver: impl FnOnce(&[ExperimentRecord]) -> Result<T, Err>,
    ) -> Option<Result<T, Err>> {
        let mut session = self.session.lock();
        session.collect_pending();
        if !session.has_run && session.buffer.is_empty() {
            return None;
        }
        let result = deliver(session.buffer.as_slice());
        match result {
            Ok(_) => {
                if !session.buffer.is_empty() {
                    debug!("delivering {} experiments", session.buffer.len());
                }
                session.buffer.clear();
            }
            Err(_) => warn!("delivery failed, keeping {} experiments buffered", session.buffer.len()),
        }
        Some(result)
    }

    pub fn progress_point(&self) -> Option<ProgressPoint> {
        self.session.lock().progress_point.clone()
    }

    pub fn scope(&self) -> Option<Scope> {
        self.session.lock().scope.clone()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().running
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }
}
