//! CLI argument definitions

use crate::format::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cozctl",
    about = "Drive a causal profiling session and collect its experiments",
    after_help = "\
EXAMPLES:
    cozctl --replay runs.json -c com.app.Worker -l 42 -s com.app
    cozctl --replay runs.json --agent-options pkg=com.app_progress-point=com.app.Worker:42
    cozctl --replay runs.json -c com.app.Worker -l 42 -s com.app --format csv --output out.csv"
)]
pub struct Args {
    /// Class of the progress point
    #[arg(short, long, requires = "line", conflicts_with = "agent_options")]
    pub class: Option<String>,

    /// Line number of the progress point
    #[arg(short, long, requires = "class")]
    pub line: Option<i32>,

    /// Package to profile
    #[arg(short, long, conflicts_with = "agent_options")]
    pub scope: Option<String>,

    /// Agent option string (pkg=..._progress-point=<class>:<line>_...)
    #[arg(long, value_name = "OPTIONS")]
    pub agent_options: Option<String>,

    /// Recorded experiments (JSON) to feed through the session
    #[arg(long, value_name = "FILE")]
    pub replay: PathBuf,

    /// Delay between replayed experiments in milliseconds
    #[arg(long, default_value = "250")]
    pub replay_pace_ms: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Coz)]
    pub format: OutputFormat,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Write experiments to file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
