//! # cozctl - Causal Profiling Session Control
//!
//! cozctl owns the control plane of a causal profiler: which progress point
//! counts as useful work, which packages are eligible for virtual speedup
//! experiments, when a profiling run is active, and how the experiments the
//! engine produces are buffered and handed to a polling client.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Polling Client (cozctl)                     │
//! │  configure → start → poll every interval → end → final drain    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ ControlService (int codes, wire bytes)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Session Controller                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ Progress pt  │   │    Scope     │   │   Running    │         │
//! │  │   + scope    │   │  validation  │   │    flag      │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                             │                                   │
//! │                             ▼                                   │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Experiment  │◀──│  Run queue   │◀──│    Sink      │◀─ Engine│
//! │  │   buffer     │   │  (channel)   │   │  (append)    │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//!
//!   progress_hit!() ──▶ Hit aggregator (per thread/class/line stats)
//! ```
//!
//! ## Module Structure
//!
//! - [`session`]: the session state machine, experiment buffer and sink
//! - [`engine`]: the boundary to whatever runs experiments, plus a replay
//!   engine that feeds recorded experiments through a session
//! - [`service`]: the integer-coded control surface and the polling client
//! - [`wire`]: big-endian encoding of drained experiment batches
//! - [`format`]: client-side rendering (coz text, CSV)
//! - [`hits`]: concurrent progress-point hit statistics and the global hook
//! - [`config`]: agent option string parsing
//! - [`cli`]: command-line arguments
//! - [`domain`]: progress points, scopes and error types

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod format;
pub mod hits;
pub mod service;
pub mod session;
pub mod wire;
