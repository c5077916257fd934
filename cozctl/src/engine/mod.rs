//! Sampling engine boundary
//!
//! The engine performs delay injection and virtual-speedup measurement. It
//! is external to this crate (an FFI agent, a subprocess, or the
//! [`ReplayEngine`] used for offline runs); the control core only drives it
//! through the [`Engine`] trait and receives its output through an
//! [`ExperimentSink`].

pub mod replay;

pub use replay::ReplayEngine;

use crate::domain::{EngineError, ProgressPoint, Scope};
use crate::session::ExperimentSink;

/// Operations the session controller invokes on the sampling engine.
///
/// All calls are made with the session lock held and must return in bounded
/// time. Implementations must not call back into the controller from these
/// methods.
pub trait Engine: Send {
    /// Check that the engine can measure `point`.
    ///
    /// Called before the point is recorded in the session.
    fn validate_progress_point(&mut self, point: &ProgressPoint) -> Result<(), EngineError> {
        let _ = point;
        Ok(())
    }

    /// Check that the engine can apply virtual speedup to `scope`.
    fn validate_scope(&mut self, scope: &Scope) -> Result<(), EngineError> {
        let _ = scope;
        Ok(())
    }

    /// Begin a run. Finished experiments go to `sink` until `stop_session`.
    fn start_session(
        &mut self,
        point: &ProgressPoint,
        scope: &Scope,
        sink: ExperimentSink,
    ) -> Result<(), EngineError>;

    /// End the current run. Must stop producing records before returning.
    fn stop_session(&mut self) -> Result<(), EngineError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn validate_progress_point(&mut self, point: &ProgressPoint) -> Result<(), EngineError> {
        (**self).validate_progress_point(point)
    }

    fn validate_scope(&mut self, scope: &Scope) -> Result<(), EngineError> {
        (**self).validate_scope(scope)
    }

    fn start_session(
        &mut self,
        point: &ProgressPoint,
        scope: &Scope,
        sink: ExperimentSink,
    ) -> Result<(), EngineError> {
        (**self).start_session(point, scope, sink)
    }

    fn stop_session(&mut self) -> Result<(), EngineError> {
        (**self).stop_session()
    }
}
