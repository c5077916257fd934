use cozctl::domain::{EngineError, ProgressPoint, Scope};
use cozctl::engine::Engine;
use cozctl::service::{ControlService, LocalControlService, ProfilerClient};
use cozctl::session::{ExperimentSink, SessionState};
use cozctl::wire;
use cozctl_common::{
    ExperimentRecord, CANNOT_CALL_WHEN_RUNNING, NORMAL_RETURN, NO_PROGRESS_POINT_SET, NO_SCOPE_SET,
    PROFILER_NOT_RUNNING,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Engine whose sink is handed back to the test, standing in for the
/// sampling thread.
#[derive(Clone, Default)]
struct HandEngine {
    sink: Arc<Mutex<Option<ExperimentSink>>>,
    stop_code: Option<i32>,
}

impl HandEngine {
    fn emit(&self, record: ExperimentRecord) {
        let sink = self.sink.lock().clone().expect("engine not started");
        sink.record(record).expect("sink closed");
    }
}

impl Engine for HandEngine {
    fn start_session(
        &mut self,
        _point: &ProgressPoint,
        _scope: &Scope,
        sink: ExperimentSink,
    ) -> Result<(), EngineError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop_session(&mut self) -> Result<(), EngineError> {
        match self.stop_code {
            Some(code) => Err(EngineError::new(code, "sampler did not stop")),
            None => Ok(()),
        }
    }
}

fn worker_record() -> ExperimentRecord {
    ExperimentRecord::new("com.app.Worker", 42, 0.25, 5_000_000_000, 120)
}

fn output(service: &impl ControlService) -> Option<Vec<ExperimentRecord>> {
    service
        .get_profiler_output()
        .expect("encode failed")
        .map(|bytes| wire::decode(&bytes).expect("decode failed"))
}

#[test]
fn test_worker_scenario() {
    let engine = HandEngine::default();
    let service = LocalControlService::new(engine.clone());

    assert_eq!(service.set_progress_point("com.app.Worker", 42), NORMAL_RETURN);
    assert_eq!(service.set_scope("com.app"), NORMAL_RETURN);
    assert_eq!(service.start_profiling(), NORMAL_RETURN);

    engine.emit(worker_record());

    assert_eq!(output(&service), Some(vec![worker_record()]));
    assert_eq!(output(&service), Some(vec![]));

    assert_eq!(service.end_profiling(), NORMAL_RETURN);
    assert_eq!(service.end_profiling(), PROFILER_NOT_RUNNING);
}

#[test]
fn test_output_before_any_run_is_absent() {
    let service = LocalControlService::new(HandEngine::default());
    assert_eq!(output(&service), None);
}

#[test]
fn test_start_ordering_codes() {
    let service = LocalControlService::new(HandEngine::default());
    assert_eq!(service.start_profiling(), NO_PROGRESS_POINT_SET);
    assert_eq!(service.controller().state(), SessionState::Idle);

    service.set_progress_point("com.app.Worker", 42);
    assert_eq!(service.start_profiling(), NO_SCOPE_SET);

    service.set_scope("com.app");
    assert_eq!(service.start_profiling(), NORMAL_RETURN);
    assert_eq!(service.start_profiling(), CANNOT_CALL_WHEN_RUNNING);
}

#[test]
fn test_configuration_is_frozen_while_running() {
    let service = LocalControlService::new(HandEngine::default());
    service.set_progress_point("com.app.Worker", 42);
    service.set_scope("com.app");
    service.start_profiling();

    assert_eq!(service.set_progress_point("com.app.Other", 7), CANNOT_CALL_WHEN_RUNNING);
    assert_eq!(service.set_scope("org.lib"), CANNOT_CALL_WHEN_RUNNING);

    assert_eq!(service.get_progress_point(), "com.app.Worker:42");
    assert_eq!(service.get_current_scope(), "com.app");
    assert_eq!(service.controller().state(), SessionState::Running);
}

#[test]
fn test_engine_stop_code_passes_through_and_session_ends() {
    let engine = HandEngine { stop_code: Some(-17), ..HandEngine::default() };
    let service = LocalControlService::new(engine.clone());
    service.set_progress_point("com.app.Worker", 42);
    service.set_scope("com.app");
    service.start_profiling();
    engine.emit(worker_record());

    assert_eq!(service.end_profiling(), -17);
    assert_eq!(service.controller().state(), SessionState::Ready);
    assert_eq!(output(&service), Some(vec![worker_record()]));
}

#[test]
fn test_records_between_polls_are_neither_lost_nor_reordered() {
    let engine = HandEngine::default();
    let service = Arc::new(LocalControlService::new(engine.clone()));
    let client = ProfilerClient::new(Arc::clone(&service));
    client.set_progress_point(&ProgressPoint::new("com.app.Worker", 42)).unwrap();
    client.set_scope(&Scope::new("com.app")).unwrap();
    client.start().unwrap();

    let producer = {
        let engine = engine.clone();
        std::thread::spawn(move || {
            for line in 0..2_000 {
                engine.emit(ExperimentRecord::new("com/app/Worker", line, 0.0, 1, 1));
            }
        })
    };

    let mut seen = Vec::new();
    while !producer.is_finished() {
        seen.extend(client.fetch_experiments().unwrap());
    }
    producer.join().unwrap();
    client.end().unwrap();
    seen.extend(client.fetch_experiments().unwrap());

    let lines: Vec<i32> = seen.iter().map(|r| r.line_no).collect();
    assert_eq!(lines, (0..2_000).collect::<Vec<_>>());
}

#[test]
fn test_restart_discards_stale_records() {
    let engine = HandEngine::default();
    let service = LocalControlService::new(engine.clone());
    service.set_progress_point("com.app.Worker", 42);
    service.set_scope("com.app");

    service.start_profiling();
    engine.emit(worker_record());
    service.end_profiling();

    assert_eq!(service.start_profiling(), NORMAL_RETURN);
    assert_eq!(output(&service), Some(vec![]));
    service.end_profiling();
}
