//! Output formats for delivered experiments
//!
//! The polling client renders every decoded experiment through an
//! [`ExperimentFormat`]. Two formats are provided:
//!
//! - [`CozFormat`]: one human-readable line per experiment
//! - [`CsvFormat`]: `index,class,line,speedup,points_hit,duration`

pub mod coz;
pub mod csv;

pub use coz::CozFormat;
pub use csv::CsvFormat;

use clap::ValueEnum;
use cozctl_common::ExperimentRecord;
use log::warn;

/// Renders one experiment as a line of output (including the newline).
pub trait ExperimentFormat: Send {
    /// Text written once before the first experiment, if any
    fn header(&self) -> Option<String> {
        None
    }

    fn format(&mut self, experiment: &ExperimentRecord) -> String;
}

/// Selectable output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Coz,
    Csv,
}

impl OutputFormat {
    /// Look up a format by name, falling back to `coz` for unknown names.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "coz" => OutputFormat::Coz,
            "csv" => OutputFormat::Csv,
            other => {
                warn!("Unknown output format: {other}. Will use 'coz' as default...");
                OutputFormat::Coz
            }
        }
    }

    /// Build a fresh formatter. CSV indices start at 1 for each formatter.
    pub fn formatter(self) -> Box<dyn ExperimentFormat> {
        match self {
            OutputFormat::Coz => Box::new(CozFormat),
            OutputFormat::Csv => Box::new(CsvFormat::new()),
        }
    }
}
