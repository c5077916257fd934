//! Progress point discovery
//!
//! - [`aggregator`]: concurrent per-line hit statistics
//! - [`hook`]: the call inserted at instrumented lines
//! - [`report`]: shutdown dump and candidate ranking output

pub mod aggregator;
pub mod hook;
pub mod report;

pub use aggregator::{HitAggregator, HitKey, HitStatistics, HitThread, Partitioning};
pub use report::{Candidate, HitReport};
