//! # Shared Data Structures (Agent ↔ Client)
//!
//! Defines the records and constants shared between the in-process control
//! side (which buffers engine output) and the polling client (which decodes
//! and renders it). Both sides must agree on these exactly, so they live in
//! their own crate with no heavy dependencies.
//!
//! ## Key Types
//!
//! - [`ExperimentRecord`] - One finished experiment produced by the sampling engine
//! - Status code constants returned by every control operation
//!
//! Enable the `serde` feature to (de)serialize records, e.g. for replay files.

// ============================================================================
// Control Status Codes
// ============================================================================

/// Operation completed successfully
pub const NORMAL_RETURN: i32 = 0;

/// `startProfiling` was called before a progress point was configured
pub const NO_PROGRESS_POINT_SET: i32 = 1;

/// `startProfiling` was called before a scope was configured
pub const NO_SCOPE_SET: i32 = 2;

/// Configuration or start was attempted while a run is active
pub const CANNOT_CALL_WHEN_RUNNING: i32 = 3;

/// `endProfiling` was called with no active run
pub const PROFILER_NOT_RUNNING: i32 = 4;

// ============================================================================
// Wire Constants
// ============================================================================

/// Size of the record count that prefixes every encoded buffer
pub const COUNT_PREFIX_LEN: usize = 4;

/// Longest class signature the wire format can carry (u16 length prefix)
pub const MAX_CLASS_SIG_LEN: usize = u16::MAX as usize;

/// Fixed-width tail of each encoded record: line (4) + speedup (4) +
/// duration (8) + points hit (8)
pub const RECORD_FIXED_LEN: usize = 4 + 4 + 8 + 8;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Result of one experiment, as produced by the sampling engine
///
/// Immutable once created. Delivery order to the client equals production
/// order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentRecord {
    /// Signature of the class containing the sped-up line
    pub class_sig: String,

    /// Line that was virtually sped up
    pub line_no: i32,

    /// Fraction of the line's cost removed (0.0 - 1.0)
    pub speedup: f32,

    /// Experiment wall duration in nanoseconds
    pub duration: i64,

    /// Progress point hits observed during the experiment
    pub points_hit: i64,
}

impl ExperimentRecord {
    pub fn new(
        class_sig: impl Into<String>,
        line_no: i32,
        speedup: f32,
        duration: i64,
        points_hit: i64,
    ) -> Self {
        Self { class_sig: class_sig.into(), line_no, speedup, duration, points_hit }
    }

    /// Encoded size of this record in bytes
    pub fn encoded_len(&self) -> usize {
        2 + self.class_sig.len() + RECORD_FIXED_LEN
    }
}
