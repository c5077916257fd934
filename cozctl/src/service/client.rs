//! # Polling Client
//!
//! Consumer side of the control surface: configures a session, starts it,
//! then drains it on a fixed cadence and renders every experiment until
//! interrupted. On exit it always ends the run and performs one last drain,
//! so experiments produced just before the stop are not lost.
//!
//! An empty drain is normal and never ends the loop. Rejected control calls
//! and undecodable output are fatal for the run and are not retried.

use super::ControlService;
use crate::domain::{ClientError, ControlError, ProgressPoint, Scope};
use crate::format::ExperimentFormat;
use crate::wire;
use anyhow::{Context, Result};
use cozctl_common::ExperimentRecord;
use log::{debug, info, warn};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Reference polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Typed wrapper over a [`ControlService`] that turns status codes into
/// errors.
pub struct ProfilerClient<S: ControlService + ?Sized> {
    service: Arc<S>,
}

impl<S: ControlService + ?Sized> ProfilerClient<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// # Errors
    /// Returns [`ClientError::Rejected`] with the session's reason.
    pub fn set_progress_point(&self, point: &ProgressPoint) -> Result<(), ClientError> {
        let code = self.service.set_progress_point(point.class_name(), point.line_number());
        check("setProgressPoint", code)
    }

    /// # Errors
    /// Returns [`ClientError::Rejected`] with the session's reason.
    pub fn set_scope(&self, scope: &Scope) -> Result<(), ClientError> {
        check("setScope", self.service.set_scope(scope.package_name()))
    }

    /// # Errors
    /// Returns [`ClientError::Rejected`] with the session's reason.
    pub fn start(&self) -> Result<(), ClientError> {
        check("startProfiling", self.service.start_profiling())
    }

    /// # Errors
    /// Returns [`ClientError::Rejected`] with the session's reason.
    pub fn end(&self) -> Result<(), ClientError> {
        check("endProfiling", self.service.end_profiling())
    }

    /// Experiments produced since the last fetch, possibly none.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the output cannot be encoded or
    /// decoded.
    pub fn fetch_experiments(&self) -> Result<Vec<ExperimentRecord>, ClientError> {
        match self.service.get_profiler_output()? {
            Some(bytes) => Ok(wire::decode(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn current_scope(&self) -> String {
        self.service.get_current_scope()
    }

    pub fn progress_point(&self) -> String {
        self.service.get_progress_point()
    }
}

fn check(operation: &'static str, code: i32) -> Result<(), ClientError> {
    match ControlError::from_code(code) {
        None => Ok(()),
        Some(source) => Err(ClientError::Rejected { operation, source }),
    }
}

/// What the polling loop should profile and for how long
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub progress_point: ProgressPoint,
    pub scope: Scope,
    pub interval: Duration,
    /// Stop after this long; `None` runs until the shutdown signal
    pub duration_limit: Option<Duration>,
}

/// Outcome of a polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSummary {
    pub polls: u64,
    pub experiments: u64,
    pub exit_reason: &'static str,
}

/// Configure, start and poll a session until `shutdown` resolves or the
/// duration limit is reached, writing each experiment to `out`.
///
/// # Errors
/// Fails if configuration or start is rejected, if output cannot be decoded,
/// or if writing to `out` fails. The run is ended before returning in every
/// case where it was started.
pub async fn run_polling_loop<S, W, F>(
    client: &ProfilerClient<S>,
    config: &PollingConfig,
    format: &mut dyn ExperimentFormat,
    out: &mut W,
    shutdown: F,
) -> Result<PollingSummary>
where
    S: ControlService + ?Sized,
    W: Write,
    F: Future<Output = ()>,
{
    client.set_progress_point(&config.progress_point)?;
    client.set_scope(&config.scope)?;
    client.start()?;
    info!(
        "profiling {} in scope {} (poll every {}ms)",
        config.progress_point,
        config.scope,
        config.interval.as_millis()
    );

    if let Some(header) = format.header() {
        out.write_all(header.as_bytes()).context("Failed to write output header")?;
    }

    let mut summary = PollingSummary { polls: 0, experiments: 0, exit_reason: "interrupted" };
    let polled = poll(client, config, format, out, shutdown, &mut summary).await;

    // End the run even if polling failed, then pick up its final experiments
    if let Err(e) = client.end() {
        warn!("failed to end profiling cleanly: {e}");
    }
    let finished = client
        .fetch_experiments()
        .map_err(anyhow::Error::from)
        .and_then(|records| render(&records, format, out));

    polled?;
    summary.experiments += finished? as u64;
    out.flush().context("Failed to flush output")?;
    Ok(summary)
}

async fn poll<S, W, F>(
    client: &ProfilerClient<S>,
    config: &PollingConfig,
    format: &mut dyn ExperimentFormat,
    out: &mut W,
    shutdown: F,
    summary: &mut PollingSummary,
) -> Result<()>
where
    S: ControlService + ?Sized,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let started = Instant::now();
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = &mut shutdown => {
                summary.exit_reason = "interrupted";
                return Ok(());
            }
        }

        if config.duration_limit.is_some_and(|limit| started.elapsed() >= limit) {
            summary.exit_reason = "duration limit reached";
            return Ok(());
        }

        let records = client.fetch_experiments()?;
        summary.polls += 1;
        if records.is_empty() {
            debug!("poll {}: no new experiments", summary.polls);
            continue;
        }
        summary.experiments += render(&records, format, out)? as u64;
        out.flush().context("Failed to flush output")?;
    }
}

fn render<W: Write>(
    records: &[ExperimentRecord],
    format: &mut dyn ExperimentFormat,
    out: &mut W,
) -> Result<usize> {
    for record in records {
        out.write_all(format.format(record).as_bytes()).context("Failed to write experiment")?;
    }
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EngineError;
    use crate::engine::Engine;
    use crate::format::CsvFormat;
    use crate::service::LocalControlService;
    use crate::session::ExperimentSink;

    /// Emits one record at start and one while stopping.
    struct BookendEngine {
        sink: Option<ExperimentSink>,
    }

    impl Engine for BookendEngine {
        fn start_session(
            &mut self,
            _point: &ProgressPoint,
            _scope: &Scope,
            sink: ExperimentSink,
        ) -> Result<(), EngineError> {
            sink.record(ExperimentRecord::new("com/app/Worker", 1, 0.1, 10, 1)).ok();
            self.sink = Some(sink);
            Ok(())
        }

        fn stop_session(&mut self) -> Result<(), EngineError> {
            if let Some(sink) = self.sink.take() {
                sink.record(ExperimentRecord::new("com/app/Worker", 2, 0.2, 20, 2)).ok();
            }
            Ok(())
        }
    }

    fn config() -> PollingConfig {
        PollingConfig {
            progress_point: ProgressPoint::new("com.app.Worker", 42),
            scope: Scope::new("com.app"),
            interval: Duration::from_millis(10),
            duration_limit: None,
        }
    }

    #[test]
    fn test_client_maps_codes_to_errors() {
        let client = ProfilerClient::new(Arc::new(LocalControlService::new(BookendEngine { sink: None })));
        let err = client.start().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Rejected { operation: "startProfiling", source: ControlError::NoProgressPointSet }
        ));
        assert!(client.fetch_experiments().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loop_delivers_final_experiments_on_interrupt() {
        let client = ProfilerClient::new(Arc::new(LocalControlService::new(BookendEngine { sink: None })));
        let mut format = CsvFormat::new();
        let mut out = Vec::new();

        let summary = run_polling_loop(
            &client,
            &config(),
            &mut format,
            &mut out,
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert_eq!(summary.exit_reason, "interrupted");
        assert_eq!(summary.experiments, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,class,line,speedup,points_hit,duration");
        assert!(lines[1].starts_with("1,com/app/Worker,1,"));
        assert!(lines[2].starts_with("2,com/app/Worker,2,"));
        assert_eq!(client.end().unwrap_err().to_string(), "endProfiling failed: profiler is not running");
    }

    #[tokio::test]
    async fn test_loop_stops_at_duration_limit() {
        let client = ProfilerClient::new(Arc::new(LocalControlService::new(BookendEngine { sink: None })));
        let mut config = config();
        config.duration_limit = Some(Duration::from_millis(30));
        let mut format = CsvFormat::new();
        let mut out = Vec::new();

        let summary =
            run_polling_loop(&client, &config, &mut format, &mut out, std::future::pending::<()>())
                .await
                .unwrap();
        assert_eq!(summary.exit_reason, "duration limit reached");
        assert_eq!(summary.experiments, 2);
    }

    #[tokio::test]
    async fn test_loop_fails_fast_on_rejected_start() {
        let service = Arc::new(LocalControlService::new(BookendEngine { sink: None }));
        service.set_progress_point("com.app.Worker", 42);
        service.set_scope("com.app");
        service.start_profiling();

        let client = ProfilerClient::new(service);
        let mut format = CsvFormat::new();
        let mut out = Vec::new();
        let err = run_polling_loop(&client, &config(), &mut format, &mut out, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("setProgressPoint"));
    }
}
