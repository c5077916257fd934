//! Shutdown reporting for hit statistics.

use super::aggregator::HitAggregator;
use serde::Serialize;
use std::io::{self, Write};

/// One bucket as seen at dump time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitReport {
    pub thread: String,
    pub class_name: String,
    pub line_number: i32,
    pub hits: u64,
    pub max_interval: u64,
}

/// A (class, line) proposed as a progress point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub class_name: String,
    pub line_number: i32,
    pub hits: u64,
    pub max_interval: u64,
}

impl HitAggregator {
    /// Print every bucket grouped by thread, then class, then line.
    ///
    /// Meant to be called once from the host's shutdown sequence.
    ///
    /// # Errors
    /// Returns any error from writing to `out`.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut current_thread: Option<String> = None;
        let mut current_class: Option<String> = None;

        for report in self.snapshot() {
            if current_thread.as_deref() != Some(report.thread.as_str()) {
                writeln!(out, "Thread {}", report.thread)?;
                current_thread = Some(report.thread.clone());
                current_class = None;
            }
            if current_class.as_deref() != Some(report.class_name.as_str()) {
                writeln!(out, "\tClass {}", report.class_name)?;
                current_class = Some(report.class_name.clone());
            }
            writeln!(
                out,
                "\t\tline {}: {} hits, {} max interval",
                report.line_number, report.hits, report.max_interval
            )?;
        }
        Ok(())
    }

    /// Write the snapshot as a JSON array.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn dump_json<W: Write>(&self, out: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(out, &self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use crate::hits::{HitAggregator, Partitioning};

    #[test]
    fn test_dump_groups_by_class() {
        let agg = HitAggregator::new(Partitioning::Global);
        agg.register_hit("com/app/Worker", 42);
        agg.register_hit("com/app/Worker", 42);
        agg.register_hit("com/app/Worker", 50);
        agg.register_hit("com/app/Reader", 7);

        let mut out = Vec::new();
        agg.dump(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Thread all threads\n\
             \tClass com/app/Reader\n\
             \t\tline 7: 1 hits, 0 max interval\n\
             \tClass com/app/Worker\n\
             \t\tline 42: 2 hits, 1 max interval\n\
             \t\tline 50: 1 hits, 0 max interval\n"
        );
    }

    #[test]
    fn test_dump_uses_thread_names() {
        let agg = HitAggregator::new(Partitioning::PerThread);
        std::thread::scope(|s| {
            std::thread::Builder::new()
                .name("worker-1".to_string())
                .spawn_scoped(s, || agg.register_hit("A", 1))
                .unwrap();
        });

        let mut out = Vec::new();
        agg.dump(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Thread worker-1 (#"));
    }

    #[test]
    fn test_dump_json() {
        let agg = HitAggregator::new(Partitioning::Global);
        agg.register_hit("A", 1);

        let mut out = Vec::new();
        agg.dump_json(&mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["class_name"], "A");
        assert_eq!(parsed[0]["hits"], 1);
        assert_eq!(parsed[0]["thread"], "all threads");
    }
}
