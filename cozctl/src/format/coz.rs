use super::ExperimentFormat;
use cozctl_common::ExperimentRecord;

/// `class:line → speedup over duration, hits` on a single line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CozFormat;

impl ExperimentFormat for CozFormat {
    fn format(&mut self, e: &ExperimentRecord) -> String {
        format!(
            "{}:{} → {:.0}% speedup over {}ns, {} hits\n",
            e.class_sig,
            e.line_no,
            f64::from(e.speedup) * 100.0,
            e.duration,
            e.points_hit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coz_line() {
        let record = ExperimentRecord::new("com.app.Worker", 42, 0.25, 5_000_000_000, 120);
        assert_eq!(
            CozFormat.format(&record),
            "com.app.Worker:42 → 25% speedup over 5000000000ns, 120 hits\n"
        );
    }
}
