//! Engine-facing append handle.
//!
//! The engine never takes the session lock. It pushes finished records into
//! a FIFO queue owned by the run; the controller moves queued records into
//! the [`ExperimentBuffer`](super::ExperimentBuffer) under the session lock
//! whenever it drains or ends the run. This keeps a `stop_session` that joins
//! an engine thread from deadlocking against that thread's last append.

use crate::domain::SinkError;
use cozctl_common::{ExperimentRecord, MAX_CLASS_SIG_LEN};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle through which the engine delivers experiments for one run.
///
/// Cheap to clone; every clone feeds the same run.
#[derive(Debug, Clone)]
pub struct ExperimentSink {
    tx: Sender<ExperimentRecord>,
    open: Arc<AtomicBool>,
}

/// Controller side of a run's queue.
#[derive(Debug)]
pub(crate) struct RunQueue {
    rx: Receiver<ExperimentRecord>,
    open: Arc<AtomicBool>,
}

/// Create the queue for a new run.
pub(crate) fn run_queue() -> (ExperimentSink, RunQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let open = Arc::new(AtomicBool::new(true));
    (ExperimentSink { tx, open: Arc::clone(&open) }, RunQueue { rx, open })
}

impl ExperimentSink {
    /// Append a finished experiment.
    ///
    /// The open check and the enqueue are not atomic with respect to `end()`.
    /// A record that slips in after `end()` has collected the queue stays in
    /// the closed queue: the next drain delivers it, a subsequent `start()`
    /// discards it. Engines avoid this by not recording once
    /// [`Engine::stop_session`](crate::engine::Engine::stop_session) has been
    /// called.
    ///
    /// # Errors
    /// - [`SinkError::SessionEnded`] once the run has been ended
    /// - [`SinkError::ClassSigTooLong`] if the record cannot be wire-encoded
    pub fn record(&self, record: ExperimentRecord) -> Result<(), SinkError> {
        if record.class_sig.len() > MAX_CLASS_SIG_LEN {
            return Err(SinkError::ClassSigTooLong(record.class_sig.len()));
        }
        if !self.open.load(Ordering::Acquire) {
            return Err(SinkError::SessionEnded);
        }
        self.tx.send(record).map_err(|_| SinkError::SessionEnded)
    }

    /// Enqueue without the open check, as a record racing `end()` would.
    #[cfg(test)]
    pub(crate) fn enqueue_unchecked(&self, record: ExperimentRecord) {
        let _ = self.tx.send(record);
    }

    /// Returns true while the run accepts records.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl RunQueue {
    /// Stop accepting records. Records already queued stay deliverable.
    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Everything queued so far, in send order.
    pub(crate) fn pending(&self) -> impl Iterator<Item = ExperimentRecord> + '_ {
        self.rx.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_arrive_in_order() {
        let (sink, queue) = run_queue();
        sink.record(ExperimentRecord::new("A", 1, 0.0, 1, 1)).unwrap();
        sink.clone().record(ExperimentRecord::new("A", 2, 0.0, 1, 1)).unwrap();

        let lines: Vec<i32> = queue.pending().map(|r| r.line_no).collect();
        assert_eq!(lines, vec![1, 2]);
        assert_eq!(queue.pending().count(), 0);
    }

    #[test]
    fn test_closed_queue_rejects_but_keeps_queued() {
        let (sink, queue) = run_queue();
        sink.record(ExperimentRecord::new("A", 1, 0.0, 1, 1)).unwrap();
        queue.close();

        assert!(!sink.is_open());
        assert_eq!(
            sink.record(ExperimentRecord::new("A", 2, 0.0, 1, 1)),
            Err(SinkError::SessionEnded)
        );
        assert_eq!(queue.pending().count(), 1);
    }

    #[test]
    fn test_dropped_queue_rejects() {
        let (sink, queue) = run_queue();
        drop(queue);
        assert_eq!(sink.record(ExperimentRecord::new("A", 1, 0.0, 1, 1)), Err(SinkError::SessionEnded));
    }

    #[test]
    fn test_oversized_class_sig_rejected() {
        let (sink, _queue) = run_queue();
        let sig = "x".repeat(MAX_CLASS_SIG_LEN + 1);
        let err = sink.record(ExperimentRecord::new(sig, 1, 0.0, 1, 1)).unwrap_err();
        assert_eq!(err, SinkError::ClassSigTooLong(MAX_CLASS_SIG_LEN + 1));
    }
}
