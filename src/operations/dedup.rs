use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::CoreConfig;
use crate::dedup::{resolve_with_progress, DedupOptions, DedupStats, RESOLVE_PHASES};
use crate::error::AppError;
use crate::events::{OperationHooks, OperationKind, OperationRecord};
use crate::ingest::load_path;
use crate::progress;
use crate::streaming::AtomicFileWriter;
use crate::table::write_csv;

use super::{run_blocking, write_failure};

/// Load, the resolve phases, then the write.
const STEPS: u64 = RESOLVE_PHASES + 2;

#[derive(Debug, Clone, Serialize)]
pub struct DedupOutcome {
    pub output_path: PathBuf,
    pub stats: DedupStats,
    pub record: OperationRecord,
}

/// Removes duplicate rows from the CSV at `input`, writing the cleaned
/// table to `output` in the input's encoding.
///
/// # Errors
///
/// - `AppError::InvalidParameter` for an unknown strategy or a missing
///   strategy column.
/// - Ingestion errors (`Io`, `Decode`, `CsvInvalid`) for the input.
/// - `AppError::InvalidColumns` if a key or strategy column is absent.
/// - `AppError::ResolveFailed` if the output cannot be written. Nothing is
///   left at `output` in that case.
pub fn dedup_file(
    input: &Path,
    output: &Path,
    options: &DedupOptions,
    config: &CoreConfig,
    hooks: &OperationHooks,
) -> Result<DedupOutcome, AppError> {
    let strategy = options.strategy()?;
    let loaded = load_path(input, &config.load_options())?;
    progress::report(hooks.progress(), 1, STEPS, &format!("Loaded {}", loaded.name()));

    let phase = |done: u64, _total: u64, message: &str| {
        progress::report(hooks.progress(), 1 + done, STEPS, message);
    };
    let (cleaned, stats) =
        resolve_with_progress(loaded.table(), &options.key_columns, &strategy, Some(&phase))?;

    let mut writer = AtomicFileWriter::new(output).map_err(write_failure(AppError::ResolveFailed))?;
    write_csv(&cleaned, loaded.encoding(), writer.writer_mut()).map_err(|e| match e {
        AppError::InvalidParameter(msg) => AppError::ResolveFailed(msg),
        other => write_failure(AppError::ResolveFailed)(other),
    })?;
    let output_path = writer.finish().map_err(write_failure(AppError::ResolveFailed))?;
    progress::report(hooks.progress(), STEPS, STEPS, "Wrote cleaned file");

    let record = OperationRecord {
        operation: OperationKind::Dedup,
        filename: loaded.name().to_string(),
        rows_processed: stats.original_rows as u64,
        output_rows: stats.cleaned_rows as u64,
        size_bytes: loaded.size_bytes(),
        parts: 1,
        encoding: loaded.encoding().label().to_string(),
    };

    info!(
        file = %loaded.name(),
        strategy = %strategy,
        removed = stats.rows_removed,
        output = %output_path.display(),
        "Dedup complete"
    );
    hooks.publish(&record);

    Ok(DedupOutcome {
        output_path,
        stats,
        record,
    })
}

/// `dedup_file` on the blocking pool.
pub async fn dedup_file_async(
    input: PathBuf,
    output: PathBuf,
    options: DedupOptions,
    config: CoreConfig,
    hooks: OperationHooks,
) -> Result<DedupOutcome, AppError> {
    run_blocking("Dedup", move || {
        dedup_file(&input, &output, &options, &config, &hooks)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::events::testing::RecordingEvents;
    use crate::progress::testing::RecordingProgress;

    fn fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("contacts.csv");
        std::fs::write(
            &path,
            b"email,name,updated\na@x.io,Ana,2024-01-01\nb@x.io,Bo,2024-02-01\na@x.io,Ana B,2024-03-01\n",
        )
        .expect("Fixture should be written");
        path
    }

    #[test]
    fn test_dedup_file_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let input = fixture(&dir);
        let output = dir.path().join("clean.csv");
        let events = Arc::new(RecordingEvents::default());
        let hooks = OperationHooks::default().with_events(events.clone());
        let options = DedupOptions::new(vec!["email".into()]).keep("most_recent", Some("updated"));

        let outcome = dedup_file(&input, &output, &options, &CoreConfig::default(), &hooks)
            .expect("Dedup should succeed");

        assert_eq!(outcome.stats.rows_removed, 1);
        assert_eq!(outcome.record.output_rows, 2);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "email,name,updated\nb@x.io,Bo,2024-02-01\na@x.io,Ana B,2024-03-01\n"
        );
        assert_eq!(events.snapshot()[0].rows, 3);
    }

    #[test]
    fn test_progress_covers_load_resolve_and_write() {
        let dir = TempDir::new().unwrap();
        let input = fixture(&dir);
        let progress = Arc::new(RecordingProgress::default());
        let hooks = OperationHooks::default().with_progress(progress.clone());

        dedup_file(
            &input,
            &dir.path().join("clean.csv"),
            &DedupOptions::new(vec!["email".into()]),
            &CoreConfig::default(),
            &hooks,
        )
        .expect("Dedup should succeed");

        let updates = progress.snapshot();
        let completed: Vec<u64> = updates.iter().map(|(done, _, _)| *done).collect();
        assert_eq!(completed, vec![1, 2, 3, 4, 5]);
        assert!(updates.iter().all(|(_, total, _)| *total == STEPS));
        assert_eq!(updates[2].2, "Selected 2 survivors");
    }

    #[test]
    fn test_latin1_input_written_back_as_latin1() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("villes.csv");
        std::fs::write(&input, b"ville,n\nQu\xe9bec,1\nQu\xe9bec,1\n").unwrap();
        let output = dir.path().join("clean.csv");

        let outcome = dedup_file(
            &input,
            &output,
            &DedupOptions::new(vec!["ville".into()]),
            &CoreConfig::default(),
            &OperationHooks::default(),
        )
        .unwrap();
        assert_eq!(outcome.record.encoding, "latin1");
        assert_eq!(std::fs::read(&output).unwrap(), b"ville,n\nQu\xe9bec,1\n");
    }

    #[test]
    fn test_unknown_key_column_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = fixture(&dir);
        let output = dir.path().join("clean.csv");

        let err = dedup_file(
            &input,
            &output,
            &DedupOptions::new(vec!["phone".into()]),
            &CoreConfig::default(),
            &OperationHooks::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidColumns { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_dedup_file_async_rejects_bad_strategy() {
        let dir = TempDir::new().unwrap();
        let input = fixture(&dir);
        let options = DedupOptions::new(vec!["email".into()]).keep("max_value", None);

        let err = dedup_file_async(
            input,
            dir.path().join("clean.csv"),
            options,
            CoreConfig::default(),
            OperationHooks::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }
}
