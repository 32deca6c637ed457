use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::CoreConfig;
use crate::error::AppError;
use crate::events::{OperationHooks, OperationKind, OperationRecord};
use crate::ingest::load_path;
use crate::split::{split_to_archive, SplitOptions, SplitSummary};
use crate::streaming::AtomicFileWriter;

use super::{run_blocking, write_failure};

#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub archive_path: PathBuf,
    pub summary: SplitSummary,
    pub record: OperationRecord,
}

/// Splits the CSV at `input` into a zip archive at `output`.
///
/// Fragments keep the input's encoding and title line. Progress is
/// reported once per fragment.
///
/// # Errors
///
/// - `AppError::InvalidParameter` if `max_rows` is zero.
/// - Ingestion errors (`Io`, `Decode`, `CsvInvalid`) for the input.
/// - `AppError::SplitFailed` if any fragment or the archive cannot be
///   written. No archive is left at `output` in that case.
pub fn split_file(
    input: &Path,
    output: &Path,
    options: &SplitOptions,
    config: &CoreConfig,
    hooks: &OperationHooks,
) -> Result<SplitOutcome, AppError> {
    if options.max_rows == 0 {
        return Err(AppError::InvalidParameter(
            "max_rows must be a positive integer".into(),
        ));
    }

    let loaded = load_path(input, &config.load_options())?;

    let (sink, archive_path) = AtomicFileWriter::new(output)
        .map_err(write_failure(AppError::SplitFailed))?
        .into_parts();
    let (sink, summary) = split_to_archive(
        loaded.table(),
        options,
        loaded.encoding(),
        sink,
        hooks.progress(),
    )?;
    let archive_path = AtomicFileWriter::finish_with(sink, archive_path)
        .map_err(write_failure(AppError::SplitFailed))?;

    let record = OperationRecord {
        operation: OperationKind::Split,
        filename: loaded.name().to_string(),
        rows_processed: summary.total_rows as u64,
        output_rows: summary.total_rows as u64,
        size_bytes: loaded.size_bytes(),
        parts: summary.parts as u64,
        encoding: loaded.encoding().label().to_string(),
    };

    info!(
        file = %loaded.name(),
        rows = summary.total_rows,
        parts = summary.parts,
        archive = %archive_path.display(),
        "Split complete"
    );
    hooks.publish(&record);

    Ok(SplitOutcome {
        archive_path,
        summary,
        record,
    })
}

/// `split_file` on the blocking pool.
pub async fn split_file_async(
    input: PathBuf,
    output: PathBuf,
    options: SplitOptions,
    config: CoreConfig,
    hooks: OperationHooks,
) -> Result<SplitOutcome, AppError> {
    run_blocking("Split", move || {
        split_file(&input, &output, &options, &config, &hooks)
    })
    .await
}
