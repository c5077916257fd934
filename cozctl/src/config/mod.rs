//! Configuration sources other than the command line

pub mod agent_options;

pub use agent_options::AgentOptions;
