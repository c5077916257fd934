//! Ordered store of finished experiments awaiting delivery.

use cozctl_common::ExperimentRecord;

/// Experiments in production order.
///
/// Not synchronized on its own: the [`SessionController`](super::SessionController)
/// only touches it while holding the session lock, which is what makes
/// `take` atomic with respect to engine appends.
#[derive(Debug, Default)]
pub struct ExperimentBuffer {
    records: Vec<ExperimentRecord>,
}

impl ExperimentBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append everything yielded by `records`, preserving order.
    pub fn extend<I: IntoIterator<Item = ExperimentRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    /// Remove and return all buffered records.
    pub fn take(&mut self) -> Vec<ExperimentRecord> {
        std::mem::take(&mut self.records)
    }

    /// Buffered records, oldest first, without removing them.
    pub fn as_slice(&self) -> &[ExperimentRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: i32) -> ExperimentRecord {
        ExperimentRecord::new("com/app/Worker", line, 0.5, 1_000, 3)
    }

    #[test]
    fn test_take_preserves_order_and_empties() {
        let mut buffer = ExperimentBuffer::new();
        buffer.extend([record(1)]);
        buffer.extend([record(2), record(3)]);

        let taken = buffer.take();
        let lines: Vec<i32> = taken.iter().map(|r| r.line_no).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(buffer.is_empty());
        assert!(buffer.take().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = ExperimentBuffer::new();
        buffer.extend([record(1)]);
        assert_eq!(buffer.len(), 1);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
