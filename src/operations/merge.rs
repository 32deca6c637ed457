use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::CoreConfig;
use crate::error::AppError;
use crate::events::{OperationHooks, OperationKind, OperationRecord};
use crate::ingest::TextEncoding;
use crate::merge::{MergeOptions, MergeReport, Merger};
use crate::progress;
use crate::streaming::AtomicFileWriter;
use crate::table::write_csv;

use super::{run_blocking, write_failure};

/// Merged output is always written as UTF-8, whatever the inputs used.
const OUTPUT_ENCODING: TextEncoding = TextEncoding::Utf8;

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub report: MergeReport,
    pub record: OperationRecord,
}

/// Loads `inputs` in order, merges them and writes the result to `output`.
///
/// Progress is reported once per loaded file, once per file stacked (or
/// once for a join), and once for the write.
///
/// # Errors
///
/// - `AppError::NoFiles` if `inputs` is empty.
/// - Ingestion errors (`Io`, `Decode`, `CsvInvalid`) for any input.
/// - Merge errors (`UnsupportedOperation`, `InvalidColumns`, `MergeFailed`).
/// - `AppError::MergeFailed` if the output cannot be written. Nothing is
///   left at `output` in that case.
pub fn merge_files(
    inputs: &[PathBuf],
    output: &Path,
    options: &MergeOptions,
    config: &CoreConfig,
    hooks: &OperationHooks,
) -> Result<MergeOutcome, AppError> {
    if inputs.is_empty() {
        return Err(AppError::NoFiles {
            required: 1,
            registered: 0,
        });
    }
    let loads = inputs.len() as u64;
    let merge_units = match options {
        MergeOptions::Vertical(_) => loads,
        MergeOptions::Horizontal(_) => 1,
    };
    let steps = loads + merge_units + 1;

    let mut merger = Merger::with_config(config);
    for (idx, path) in inputs.iter().enumerate() {
        let (_, file) = merger.add(path, None)?;
        progress::report(
            hooks.progress(),
            idx as u64 + 1,
            steps,
            &format!("Loaded {}", file.name()),
        );
    }

    let merge_step = |done: u64, _total: u64, message: &str| {
        progress::report(hooks.progress(), loads + done, steps, message);
    };
    let merged = merger.execute_with_progress(options, Some(&merge_step))?;

    let mut writer = AtomicFileWriter::new(output).map_err(write_failure(AppError::MergeFailed))?;
    write_csv(&merged, OUTPUT_ENCODING, writer.writer_mut())
        .map_err(write_failure(AppError::MergeFailed))?;
    let output_path = writer.finish().map_err(write_failure(AppError::MergeFailed))?;
    progress::report(hooks.progress(), steps, steps, "Wrote merged file");

    let report = merger.report(options.merge_type(), &merged, Some(&output_path));
    let record = OperationRecord {
        operation: OperationKind::Merge,
        filename: output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| output_path.display().to_string()),
        rows_processed: merger.total_rows() as u64,
        output_rows: merged.row_count() as u64,
        size_bytes: merger.total_size(),
        parts: 1,
        encoding: OUTPUT_ENCODING.label().to_string(),
    };

    info!(
        files = merger.len(),
        rows = merged.row_count(),
        output = %output_path.display(),
        "Merge complete"
    );
    hooks.publish(&record);

    Ok(MergeOutcome {
        output_path,
        rows: merged.row_count(),
        columns: merged.column_count(),
        report,
        record,
    })
}

/// `merge_files` on the blocking pool.
pub async fn merge_files_async(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    options: MergeOptions,
    config: CoreConfig,
    hooks: OperationHooks,
) -> Result<MergeOutcome, AppError> {
    run_blocking("Merge", move || {
        merge_files(&inputs, &output, &options, &config, &hooks)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::events::testing::RecordingEvents;
    use crate::merge::{ColumnsMode, HorizontalOptions, MergeType, VerticalOptions};
    use crate::progress::testing::RecordingProgress;
    use crate::table::JoinType;

    fn write(dir: &TempDir, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).expect("Fixture should be written");
        path
    }

    #[test]
    fn test_vertical_merge_with_source_column() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write(&dir, "a.csv", b"id,name\n1,Ana\n"),
            write(&dir, "b.csv", b"id,email\n2,b@x.io\n"),
        ];
        let output = dir.path().join("merged.csv");
        let progress = Arc::new(RecordingProgress::default());
        let events = Arc::new(RecordingEvents::default());
        let hooks = OperationHooks::default()
            .with_progress(progress.clone())
            .with_events(events.clone());
        let options = MergeOptions::Vertical(VerticalOptions {
            columns_mode: ColumnsMode::Intersection,
            include_source: true,
        });

        let outcome = merge_files(&inputs, &output, &options, &CoreConfig::default(), &hooks)
            .expect("Merge should succeed");

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "id,_source_file\n1,a.csv\n2,b.csv\n"
        );
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.report.merge_type, MergeType::Vertical);
        let updates = progress.snapshot();
        assert_eq!(updates.len(), 5);
        assert_eq!(updates[3], (4, 5, "Stacked b.csv".to_string()));
        assert_eq!(updates[4], (5, 5, "Wrote merged file".to_string()));
        assert_eq!(events.snapshot()[0].filename, "merged.csv");
    }

    #[test]
    fn test_latin1_inputs_merge_to_utf8() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write(&dir, "a.csv", b"id,ville\n1,Qu\xe9bec\n"),
            write(&dir, "b.csv", "id,ville\n2,Montréal\n".as_bytes()),
        ];
        let output = dir.path().join("merged.csv");

        merge_files(
            &inputs,
            &output,
            &MergeOptions::default(),
            &CoreConfig::default(),
            &OperationHooks::default(),
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "id,ville\n1,Québec\n2,Montréal\n"
        );
    }

    #[test]
    fn test_failed_join_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write(&dir, "a.csv", b"id,x\n1,a\n"),
            write(&dir, "b.csv", b"id,y\n1,b\n"),
        ];
        let output = dir.path().join("merged.csv");
        let events = Arc::new(RecordingEvents::default());
        let options = MergeOptions::Horizontal(HorizontalOptions {
            join_columns: vec!["sku".into()],
            join_type: JoinType::Inner,
        });

        let err = merge_files(
            &inputs,
            &output,
            &options,
            &CoreConfig::default(),
            &OperationHooks::default().with_events(events.clone()),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidColumns { .. }));
        assert!(!output.exists());
        assert!(events.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_merge_files_async_join() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write(&dir, "a.csv", b"id,x\n1,a\n2,b\n"),
            write(&dir, "b.csv", b"id,y\n1,p\n3,q\n"),
        ];
        let output = dir.path().join("joined.csv");
        let options = MergeOptions::Horizontal(HorizontalOptions {
            join_columns: vec!["id".into()],
            join_type: JoinType::Outer,
        });

        let outcome = merge_files_async(
            inputs,
            output.clone(),
            options,
            CoreConfig::default(),
            OperationHooks::default(),
        )
        .await
        .expect("Async merge should succeed");
        assert_eq!(outcome.rows, 3);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "id,x,y\n1,a,p\n2,b,\n3,,q\n"
        );
    }

    #[tokio::test]
    async fn test_no_inputs() {
        let dir = TempDir::new().unwrap();
        let err = merge_files_async(
            Vec::new(),
            dir.path().join("out.csv"),
            MergeOptions::default(),
            CoreConfig::default(),
            OperationHooks::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NoFiles { .. }));
    }
}
