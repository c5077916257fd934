//! Structured error types for cozctl
//!
//! Using thiserror for automatic Display implementation and error chaining.

use cozctl_common::{
    CANNOT_CALL_WHEN_RUNNING, NORMAL_RETURN, NO_PROGRESS_POINT_SET,
    NO_SCOPE_SET, PROFILER_NOT_RUNNING,
};
use thiserror::Error;

/// Failure reported by the external sampling engine.
///
/// The code is opaque to the control core and is passed through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine error {code}: {message}")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Rejected control operation.
///
/// Ordering errors never mutate session state; the caller recovers by
/// correcting the session configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("no progress point set")]
    NoProgressPointSet,

    #[error("no scope set")]
    NoScopeSet,

    #[error("cannot call while profiling is running")]
    CannotCallWhenRunning,

    #[error("profiler is not running")]
    ProfilerNotRunning,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ControlError {
    /// Integer status code exposed on the control surface
    pub fn code(&self) -> i32 {
        match self {
            ControlError::NoProgressPointSet => NO_PROGRESS_POINT_SET,
            ControlError::NoScopeSet => NO_SCOPE_SET,
            ControlError::CannotCallWhenRunning => CANNOT_CALL_WHEN_RUNNING,
            ControlError::ProfilerNotRunning => PROFILER_NOT_RUNNING,
            ControlError::Engine(e) => e.code,
        }
    }

    /// Inverse of [`ControlError::code`]. Returns `None` for `NORMAL_RETURN`.
    ///
    /// Codes outside the known table are treated as engine codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            NORMAL_RETURN => None,
            NO_PROGRESS_POINT_SET => Some(ControlError::NoProgressPointSet),
            NO_SCOPE_SET => Some(ControlError::NoScopeSet),
            CANNOT_CALL_WHEN_RUNNING => Some(ControlError::CannotCallWhenRunning),
            PROFILER_NOT_RUNNING => Some(ControlError::ProfilerNotRunning),
            other => Some(ControlError::Engine(EngineError::new(other, "reported by engine"))),
        }
    }
}

/// Status code for a control result
pub fn status_code(result: &Result<(), ControlError>) -> i32 {
    match result {
        Ok(()) => NORMAL_RETURN,
        Err(e) => e.code(),
    }
}

/// Engine-side append rejected by an [`ExperimentSink`](crate::session::ExperimentSink)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("profiling session has ended")]
    SessionEnded,

    #[error("class signature is {0} bytes, wire limit is 65535")]
    ClassSigTooLong(usize),
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("buffer truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("negative record count: {0}")]
    NegativeCount(i32),

    #[error("class signature is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("class signature is {0} bytes, wire limit is 65535")]
    ClassSigTooLong(usize),

    #[error("{0} trailing bytes after last record")]
    TrailingBytes(usize),

    #[error("too many records for a 4-byte count: {0}")]
    TooManyRecords(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Client-side view of a failed remote control call
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{operation} failed: {source}")]
    Rejected {
        operation: &'static str,
        #[source]
        source: ControlError,
    },

    #[error("failed to decode profiler output: {0}")]
    Decode(#[from] WireError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("missing progress point in '{0}' (expected <class>:<line>)")]
    InvalidProgressPoint(String),

    #[error("invalid warmup value '{0}' (expected milliseconds)")]
    InvalidWarmup(String),

    #[error("empty agent options")]
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("a hit aggregator is already installed for this process")]
    AlreadyInstalled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_error_codes() {
        assert_eq!(ControlError::NoProgressPointSet.code(), 1);
        assert_eq!(ControlError::NoScopeSet.code(), 2);
        assert_eq!(ControlError::CannotCallWhenRunning.code(), 3);
        assert_eq!(ControlError::ProfilerNotRunning.code(), 4);
        assert_eq!(ControlError::Engine(EngineError::new(-7, "bad location")).code(), -7);
    }

    #[test]
    fn test_from_code_round_trips_known_codes() {
        assert_eq!(ControlError::from_code(0), None);
        for code in 1..=4 {
            assert_eq!(ControlError::from_code(code).map(|e| e.code()), Some(code));
        }
    }

    #[test]
    fn test_unknown_code_passes_through_as_engine_error() {
        let err = ControlError::from_code(-12).unwrap();
        assert!(matches!(err, ControlError::Engine(EngineError { code: -12, .. })));
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(&Ok(())), 0);
        assert_eq!(status_code(&Err(ControlError::ProfilerNotRunning)), 4);
    }

    #[test]
    fn test_rejected_display_names_operation() {
        let err = ClientError::Rejected {
            operation: "startProfiling",
            source: ControlError::NoScopeSet,
        };
        assert_eq!(err.to_string(), "startProfiling failed: no scope set");
    }
}
