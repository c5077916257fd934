//! Profiling session core
//!
//! - `controller`: the start/stop/configure state machine
//! - `buffer`: experiments awaiting delivery
//! - `sink`: the engine's append handle

pub mod buffer;
pub mod controller;
pub mod sink;

pub use buffer::ExperimentBuffer;
pub use controller::{SessionController, SessionState};
pub use sink::ExperimentSink;
