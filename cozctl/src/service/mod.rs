//! Remote control surface
//!
//! [`ControlService`] is the procedure table a transport (JMX-like RPC,
//! sockets, FFI) exposes to the polling client. Every operation returns the
//! integer codes of [`cozctl_common`] so the surface is language-neutral.
//! [`LocalControlService`] implements it over a [`SessionController`];
//! [`client`] is the consuming side.

pub mod client;

pub use client::{run_polling_loop, PollingConfig, PollingSummary, ProfilerClient};

use crate::domain::{status_code, ProgressPoint, Scope, WireError};
use crate::engine::Engine;
use crate::session::SessionController;
use crate::wire;
use log::error;
use std::sync::Arc;

/// Control procedures exposed over the transport.
pub trait ControlService: Send + Sync {
    fn set_progress_point(&self, class_name: &str, line_number: i32) -> i32;

    fn set_scope(&self, package_name: &str) -> i32;

    fn start_profiling(&self) -> i32;

    fn end_profiling(&self) -> i32;

    /// Encoded experiments produced since the last call.
    ///
    /// `Ok(None)` if the session has never run. Never blocks beyond copying
    /// the buffer.
    fn get_profiler_output(&self) -> Result<Option<Vec<u8>>, WireError>;

    /// Configured scope, empty if unset
    fn get_current_scope(&self) -> String;

    /// Configured progress point as `<class>:<line>`, empty if unset
    fn get_progress_point(&self) -> String;
}

/// In-process control service owning one session.
pub struct LocalControlService<E: Engine> {
    controller: Arc<SessionController<E>>,
}

impl<E: Engine> LocalControlService<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self { controller: Arc::new(SessionController::new(engine)) }
    }

    /// Handle to the underlying session, e.g. for shutdown sequencing.
    pub fn controller(&self) -> Arc<SessionController<E>> {
        Arc::clone(&self.controller)
    }
}

impl<E: Engine> ControlService for LocalControlService<E> {
    fn set_progress_point(&self, class_name: &str, line_number: i32) -> i32 {
        status_code(&self.controller.set_progress_point(ProgressPoint::new(class_name, line_number)))
    }

    fn set_scope(&self, package_name: &str) -> i32 {
        status_code(&self.controller.set_scope(Scope::new(package_name)))
    }

    fn start_profiling(&self) -> i32 {
        status_code(&self.controller.start())
    }

    fn end_profiling(&self) -> i32 {
        status_code(&self.controller.end())
    }

    fn get_profiler_output(&self) -> Result<Option<Vec<u8>>, WireError> {
        // Records leave the buffer only once they are encoded
        self.controller
            .deliver_with(wire::encode)
            .transpose()
            .inspect_err(|e| error!("failed to encode experiments, keeping them buffered: {e}"))
    }

    fn get_current_scope(&self) -> String {
        self.controller.scope().map(|s| s.to_string()).unwrap_or_default()
    }

    fn get_progress_point(&self) -> String {
        self.controller.progress_point().map(|p| p.to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EngineError;
    use crate::session::ExperimentSink;
    use cozctl_common::{
        ExperimentRecord, CANNOT_CALL_WHEN_RUNNING, NORMAL_RETURN, NO_PROGRESS_POINT_SET,
        NO_SCOPE_SET, PROFILER_NOT_RUNNING,
    };

    struct OneShotEngine;

    impl Engine for OneShotEngine {
        fn start_session(
            &mut self,
            _point: &ProgressPoint,
            _scope: &Scope,
            sink: ExperimentSink,
        ) -> Result<(), EngineError> {
            sink.record(ExperimentRecord::new("com/app/Worker", 42, 0.5, 10, 2))
                .map_err(|e| EngineError::new(-1, e.to_string()))
        }

        fn stop_session(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_codes_follow_the_table() {
        let service = LocalControlService::new(OneShotEngine);
        assert_eq!(service.start_profiling(), NO_PROGRESS_POINT_SET);
        assert_eq!(service.set_progress_point("com.app.Worker", 42), NORMAL_RETURN);
        assert_eq!(service.start_profiling(), NO_SCOPE_SET);
        assert_eq!(service.set_scope("com.app"), NORMAL_RETURN);
        assert_eq!(service.end_profiling(), PROFILER_NOT_RUNNING);
        assert_eq!(service.start_profiling(), NORMAL_RETURN);
        assert_eq!(service.set_scope("org"), CANNOT_CALL_WHEN_RUNNING);
        assert_eq!(service.end_profiling(), NORMAL_RETURN);
    }

    #[test]
    fn test_string_getters() {
        let service = LocalControlService::new(OneShotEngine);
        assert_eq!(service.get_progress_point(), "");
        assert_eq!(service.get_current_scope(), "");

        service.set_progress_point("com.app.Worker", 42);
        service.set_scope("com.app");
        assert_eq!(service.get_progress_point(), "com.app.Worker:42");
        assert_eq!(service.get_current_scope(), "com.app");
    }

    #[test]
    fn test_output_is_encoded() {
        let service = LocalControlService::new(OneShotEngine);
        assert!(service.get_profiler_output().unwrap().is_none());

        service.set_progress_point("com.app.Worker", 42);
        service.set_scope("com.app");
        service.start_profiling();

        let bytes = service.get_profiler_output().unwrap().unwrap();
        let records = wire::decode(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_no, 42);

        let empty = service.get_profiler_output().unwrap().unwrap();
        assert_eq!(empty, vec![0, 0, 0, 0]);
    }
}
