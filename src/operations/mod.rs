//! File-to-file jobs built on the engines.
//!
//! Each job loads its input(s), runs one transformation, and writes the
//! artifact through an `AtomicFileWriter`: the output path either receives
//! a complete file or is left untouched. On success the job returns an
//! `OperationRecord` and publishes its event. The `*_async` variants run
//! the same job on tokio's blocking pool.

mod dedup;
mod merge;
mod split;

pub use dedup::{dedup_file, dedup_file_async, DedupOutcome};
pub use merge::{merge_files, merge_files_async, MergeOutcome};
pub use split::{split_file, split_file_async, SplitOutcome};

use crate::error::AppError;

/// Re-labels write-side I/O failures as the operation's own failure kind.
/// Errors that already carry a specific kind pass through.
fn write_failure(wrap: fn(String) -> AppError) -> impl Fn(AppError) -> AppError {
    move |err| match err {
        AppError::Io(msg) | AppError::Internal(msg) => wrap(msg),
        other => other,
    }
}

/// Joins a blocking job, surfacing a panic as an internal error.
async fn run_blocking<T, F>(label: &'static str, job: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(format!("{} task panicked: {}", label, e)))?
}
