//! Agent option strings
//!
//! The in-process agent receives its configuration as one string of
//! underscore-separated `key=value` items (semicolons are awkward in shell
//! command lines):
//!
//! ```text
//! pkg=com.app_progress-point=com.app.Worker:42_warmup=1000_ignore=com.app.gen|com.app.test
//! ```
//!
//! | key                    | meaning                                         |
//! |------------------------|-------------------------------------------------|
//! | `pkg` / `package`      | scope to speed up                               |
//! | `progress-point`       | `<class>:<line>`                                |
//! | `end-to-end`           | measure end-to-end instead of a line            |
//! | `warmup`               | delay before the first experiment, ms           |
//! | `fix-exp`              | keep experiment length fixed                    |
//! | `ignore`               | pipe-separated packages excluded from the scope |
//! | `traces`               | print sampled stack traces                      |

use crate::domain::{canonicalize, OptionsError, ProgressPoint, Scope};
use log::{info, warn};
use std::time::Duration;

/// Warmup used when the option string does not set one
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(5000);

/// Parsed agent configuration. Names are canonical (`/`-separated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub scope: Option<Scope>,
    pub progress_point: Option<ProgressPoint>,
    pub end_to_end: bool,
    pub warmup: Duration,
    pub fixed_experiment_duration: bool,
    pub ignored: Vec<Scope>,
    pub print_traces: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            scope: None,
            progress_point: None,
            end_to_end: false,
            warmup: DEFAULT_WARMUP,
            fixed_experiment_duration: false,
            ignored: Vec::new(),
            print_traces: false,
        }
    }
}

impl AgentOptions {
    /// Parse an option string.
    ///
    /// Unknown keys are logged and skipped.
    ///
    /// # Errors
    /// - [`OptionsError::Empty`] for a blank string
    /// - [`OptionsError::InvalidProgressPoint`] if the point lacks `:<line>`
    /// - [`OptionsError::InvalidWarmup`] if warmup is not a number
    pub fn parse(options: &str) -> Result<Self, OptionsError> {
        if options.trim().is_empty() {
            return Err(OptionsError::Empty);
        }

        let mut parsed = Self::default();
        for item in options.split('_').filter(|item| !item.is_empty()) {
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            match key {
                "pkg" | "package" => parsed.scope = Some(Scope::new(canonicalize(value))),
                "progress-point" => {
                    let point = ProgressPoint::parse(value)
                        .ok_or_else(|| OptionsError::InvalidProgressPoint(value.to_string()))?;
                    parsed.progress_point =
                        Some(ProgressPoint::new(canonicalize(point.class_name()), point.line_number()));
                }
                "end-to-end" => parsed.end_to_end = true,
                "warmup" => {
                    let millis: u64 =
                        value.parse().map_err(|_| OptionsError::InvalidWarmup(value.to_string()))?;
                    parsed.warmup = Duration::from_millis(millis);
                }
                "fix-exp" => parsed.fixed_experiment_duration = true,
                "ignore" => parsed.ignored.extend(
                    value.split('|').filter(|s| !s.is_empty()).map(|s| Scope::new(canonicalize(s))),
                ),
                "traces" => parsed.print_traces = true,
                other => warn!("ignoring unknown agent option '{other}'"),
            }
        }
        parsed.log_summary();
        Ok(parsed)
    }

    /// Keys that are set but that the replay engine cannot honor.
    pub fn unsupported_by_replay(&self) -> Vec<&'static str> {
        [
            ("end-to-end", self.end_to_end),
            ("fix-exp", self.fixed_experiment_duration),
            ("traces", self.print_traces),
        ]
        .into_iter()
        .filter_map(|(key, set)| set.then_some(key))
        .collect()
    }

    fn log_summary(&self) {
        let ignored: Vec<String> = self.ignored.iter().map(ToString::to_string).collect();
        info!(
            "agent options: progress point {}, scope {}, ignored [{}], warmup {}ms, end-to-end {}, fixed experiment duration {}, traces {}",
            self.progress_point.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
            self.scope.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
            ignored.join(", "),
            self.warmup.as_millis(),
            self.end_to_end,
            self.fixed_experiment_duration,
            self.print_traces,
        );
    }
}
