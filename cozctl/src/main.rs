//! # cozctl - Main Entry Point
//!
//! Hosts a profiling session in-process, backed by the replay engine, and
//! drives it with the polling client:
//!
//! 1. Resolve progress point and scope (`-c/-l/-s` or `--agent-options`)
//! 2. Configure and start the session
//! 3. Poll on `--interval-ms` and render experiments (`--format`)
//! 4. On Ctrl+C or `--duration`, end the session and deliver what is left

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cozctl::cli::Args;
use cozctl::config::AgentOptions;
use cozctl::domain::{ProgressPoint, Scope};
use cozctl::engine::ReplayEngine;
use cozctl::service::{run_polling_loop, LocalControlService, PollingConfig, ProfilerClient};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string().to_lowercase().contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Resolve what to profile from CLI arguments.
///
/// Supports two modes:
/// - `-c <class> -l <line> -s <package>` - explicit
/// - `--agent-options pkg=..._progress-point=<class>:<line>` - agent syntax
///
/// Also returns the remaining agent options. The explicit mode has no
/// warmup.
fn resolve_target(args: &Args) -> Result<(ProgressPoint, Scope, AgentOptions)> {
    if let Some(ref options) = args.agent_options {
        let mut options = AgentOptions::parse(options).context("Invalid --agent-options")?;
        let point = options
            .progress_point
            .take()
            .context("Missing required argument: progress-point in --agent-options")?;
        let scope =
            options.scope.take().context("Missing required argument: pkg in --agent-options")?;
        return Ok((point, scope, options));
    }

    match (&args.class, args.line, &args.scope) {
        (Some(class), Some(line), Some(scope)) => Ok((
            ProgressPoint::new(class.as_str(), line),
            Scope::new(scope.as_str()),
            AgentOptions { warmup: Duration::ZERO, ..AgentOptions::default() },
        )),
        _ => anyhow::bail!(
            "Missing required argument: --class, --line and --scope (or --agent-options)\n\n\
             Usage:\n  \
             cozctl --replay runs.json -c com.app.Worker -l 42 -s com.app\n\n\
             Run 'cozctl --help' for more options"
        ),
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let (progress_point, scope, options) = resolve_target(&args)?;
    for key in options.unsupported_by_replay() {
        warn!("agent option '{key}' is not supported by the replay engine and has no effect");
    }

    let engine = ReplayEngine::from_file(&args.replay, Duration::from_millis(args.replay_pace_ms))?
        .with_warmup(options.warmup)
        .with_ignored(options.ignored);
    if !quiet {
        eprintln!("cozctl v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("replay: {} ({} experiments)", args.replay.display(), engine.record_count());
        eprintln!("progress point: {progress_point}");
        eprintln!("scope: {scope}");
    }

    let service = Arc::new(LocalControlService::new(engine));
    let client = ProfilerClient::new(service);

    let config = PollingConfig {
        progress_point,
        scope,
        interval: Duration::from_millis(args.interval_ms.max(1)),
        duration_limit: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
    };

    let mut out: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut format = args.format.formatter();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    let started = Instant::now();
    let summary = run_polling_loop(&client, &config, format.as_mut(), &mut out, shutdown).await?;
    info!("polling finished after {} polls", summary.polls);

    if !quiet {
        eprintln!(
            "\n{}: {:.1}s, {} experiments over {} polls",
            summary.exit_reason,
            started.elapsed().as_secs_f64(),
            summary.experiments,
            summary.polls,
        );
        if let Some(ref path) = args.output {
            eprintln!("saved: {}", path.display());
        }
    }

    Ok(())
}
