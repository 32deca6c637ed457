//! Coarse progress reporting.
//!
//! Engines report `(completed_units, total_units, message)` once per
//! fragment, file or phase. The sink decides what to do with it; the core
//! never tracks task ids or polls for cancellation.

/// Receives progress updates from a running operation.
pub trait ProgressSink: Send + Sync {
    fn report(&self, completed: u64, total: u64, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64, &str) + Send + Sync,
{
    fn report(&self, completed: u64, total: u64, message: &str) {
        self(completed, total, message)
    }
}

/// Forwards to `sink` when one was supplied.
pub(crate) fn report(sink: Option<&dyn ProgressSink>, completed: u64, total: u64, message: &str) {
    if let Some(sink) = sink {
        sink.report(completed, total, message);
    }
}
