use super::ExperimentFormat;
use cozctl_common::ExperimentRecord;

/// Comma-separated rows with a running index starting at 1.
///
/// The index belongs to the formatter instance, not the process: two
/// formatters each count from 1.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    next_index: u64,
}

impl CsvFormat {
    #[must_use]
    pub fn new() -> Self {
        Self { next_index: 1 }
    }
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentFormat for CsvFormat {
    fn header(&self) -> Option<String> {
        Some("index,class,line,speedup,points_hit,duration\n".to_string())
    }

    fn format(&mut self, e: &ExperimentRecord) -> String {
        let index = self.next_index;
        self.next_index += 1;
        format!(
            "{index},{},{},{},{},{}\n",
            e.class_sig, e.line_no, e.speedup, e.points_hit, e.duration
        )
    }
}
