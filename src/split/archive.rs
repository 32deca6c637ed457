//! Packaging fragments into a zip archive.

use std::io::{Seek, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppError;
use crate::ingest::TextEncoding;
use crate::progress::{self, ProgressSink};
use crate::table::{to_csv_bytes, Table};

use super::{fragment_name, split, SplitOptions, SplitSummary};

/// Writes each fragment as `part_{i}_of_{n}.csv` into a deflated zip on `sink`.
///
/// Fragments are serialized straight into their archive entry, so no
/// per-fragment file ever exists outside the archive. Progress is reported
/// once per fragment. On success the finished sink is handed back; on
/// failure it is dropped, so a partial archive is never returned.
///
/// # Errors
///
/// Returns `AppError::SplitFailed` wrapping the first serialization,
/// encoding or archive error.
pub fn write_archive<W: Write + Seek>(
    fragments: &[Table],
    encoding: TextEncoding,
    sink: W,
    progress: Option<&dyn ProgressSink>,
) -> Result<W, AppError> {
    let total = fragments.len();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(sink);

    for (idx, fragment) in fragments.iter().enumerate() {
        let name = fragment_name(idx, total);
        let bytes = to_csv_bytes(fragment, encoding)
            .map_err(|e| AppError::SplitFailed(format!("{}: {}", name, e)))?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| AppError::SplitFailed(format!("Failed to add {}: {}", name, e)))?;
        zip.write_all(&bytes)
            .map_err(|e| AppError::SplitFailed(format!("Failed to write {}: {}", name, e)))?;

        debug!(part = %name, rows = fragment.row_count(), bytes = bytes.len(), "Archived fragment");
        progress::report(
            progress,
            (idx + 1) as u64,
            total as u64,
            &format!("Wrote {}", name),
        );
    }

    zip.finish()
        .map_err(|e| AppError::SplitFailed(format!("Failed to finish archive: {}", e)))
}

/// Splits `table` and archives the fragments on `sink`.
pub fn split_to_archive<W: Write + Seek>(
    table: &Table,
    options: &SplitOptions,
    encoding: TextEncoding,
    sink: W,
    progress: Option<&dyn ProgressSink>,
) -> Result<(W, SplitSummary), AppError> {
    let fragments = split(table, options.max_rows)?;
    let total = fragments.len();
    let sink = write_archive(&fragments, encoding, sink, progress)?;

    let summary = SplitSummary {
        total_rows: table.row_count(),
        parts: total,
        part_names: (0..total).map(|i| fragment_name(i, total)).collect(),
        rows_per_part: fragments.iter().map(Table::row_count).collect(),
    };
    Ok((sink, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use crate::ingest::{load_bytes, LoadOptions};
    use crate::progress::testing::RecordingProgress;
    use crate::table::Value;

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive should open");
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).expect("Entry should exist");
                let mut content = Vec::new();
                entry.read_to_end(&mut content).expect("Entry should read");
                (entry.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_archive_entries_named_and_ordered() {
        let source = b"Inventory\nsku,qty\nA,1\nB,2\nC,3\nD,4\nE,5\n";
        let loaded = load_bytes("inv.csv", source, &LoadOptions::default()).unwrap();

        let (sink, summary) = split_to_archive(
            loaded.table(),
            &SplitOptions::new(2),
            loaded.encoding(),
            Cursor::new(Vec::new()),
            None,
        )
        .unwrap();

        assert_eq!(summary.parts, 3);
        assert_eq!(summary.rows_per_part, vec![2, 2, 1]);

        let entries = read_entries(sink.into_inner());
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["part_1_of_3.csv", "part_2_of_3.csv", "part_3_of_3.csv"]
        );
        assert_eq!(entries[0].1, b"Inventory\nsku,qty\nA,1\nB,2\n");
        assert_eq!(entries[2].1, b"Inventory\nsku,qty\nE,5\n");
    }

    #[test]
    fn test_each_fragment_reloads_independently() {
        let mut source = String::from("id,name\n");
        for i in 0..7 {
            source.push_str(&format!("{},name{}\n", i, i));
        }
        let loaded = load_bytes("people.csv", source.as_bytes(), &LoadOptions::default()).unwrap();
        let (sink, _) = split_to_archive(
            loaded.table(),
            &SplitOptions::new(3),
            loaded.encoding(),
            Cursor::new(Vec::new()),
            None,
        )
        .unwrap();

        let mut rebuilt: Vec<Vec<Value>> = Vec::new();
        for (name, content) in read_entries(sink.into_inner()) {
            let part = load_bytes(&name, &content, &LoadOptions::default()).unwrap();
            assert_eq!(part.table().columns(), loaded.table().columns());
            rebuilt.extend(part.table().rows().iter().cloned());
        }
        assert_eq!(rebuilt, loaded.table().rows());
    }

    #[test]
    fn test_latin1_fragments_stay_latin1() {
        let loaded = load_bytes("fr.csv", b"ville,n\nQu\xe9bec,1\n", &LoadOptions::default()).unwrap();
        let (sink, _) = split_to_archive(
            loaded.table(),
            &SplitOptions::new(10),
            loaded.encoding(),
            Cursor::new(Vec::new()),
            None,
        )
        .unwrap();
        let entries = read_entries(sink.into_inner());
        assert_eq!(entries[0].1, b"ville,n\nQu\xe9bec,1\n");
    }

    #[test]
    fn test_progress_reported_per_fragment() {
        let loaded =
            load_bytes("x.csv", b"a,b\n1,2\n3,4\n5,6\n", &LoadOptions::default()).unwrap();
        let recorder = RecordingProgress::default();
        split_to_archive(
            loaded.table(),
            &SplitOptions::new(1),
            loaded.encoding(),
            Cursor::new(Vec::new()),
            Some(&recorder),
        )
        .unwrap();

        let updates = recorder.snapshot();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].0, 3);
        assert_eq!(updates[2].1, 3);
        assert!(updates[0].2.contains("part_1_of_3.csv"));
    }

    #[test]
    fn test_unencodable_fragment_aborts_split() {
        let table = Table::from_rows(vec!["name".into()], vec![vec!["ok".into()], vec!["€".into()]]);
        let result = split_to_archive(
            &table,
            &SplitOptions::new(1),
            TextEncoding::Latin1,
            Cursor::new(Vec::new()),
            None,
        );
        assert!(matches!(result, Err(AppError::SplitFailed(_))));
    }
}
