//! CSV ingestion with encoding fallback and title-row detection.
//!
//! Loading tries each candidate encoding in a fixed order. An attempt either
//! produces a table, reports that the bytes are not valid in that encoding
//! (move on to the next candidate), or fails for a structural reason that no
//! other encoding would fix (stop immediately).

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::error::AppError;
use crate::table::{is_null_token, ColumnType, Record, Table, Value};

use super::encoding::{candidate_labels, TextEncoding, CANDIDATE_ENCODINGS, UTF8_BOM};

/// Rows shown by `LoadedFile::inspect`.
const INSPECT_SAMPLE_ROWS: usize = 5;

/// Buffer size for streamed reads (64 KB).
const BUFFER_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Treat a first record with a single field as a title above the header.
    pub detect_title: bool,
    /// Sources above this size are streamed and assembled in batches.
    pub large_file_threshold_bytes: u64,
    /// Rows per batch for streamed sources.
    pub batch_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        CoreConfig::default().load_options()
    }
}

/// A table plus where it came from and how it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    name: String,
    path: Option<PathBuf>,
    encoding: TextEncoding,
    size_bytes: u64,
    table: Table,
}

/// Summary of a loaded file for display before an operation runs.
#[derive(Debug, Clone, Serialize)]
pub struct FileInspection {
    pub name: String,
    pub encoding: TextEncoding,
    pub size_bytes: u64,
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub column_types: Vec<(String, ColumnType)>,
    pub row_count: usize,
    pub sample_rows: Vec<Record>,
}

impl LoadedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Column names paired with their inferred type tags.
    pub fn column_types(&self) -> Vec<(String, ColumnType)> {
        self.table
            .columns()
            .iter()
            .cloned()
            .zip(self.table.dtypes().iter().copied())
            .collect()
    }

    /// Columns, types, row count and the first few rows.
    pub fn inspect(&self) -> FileInspection {
        let sample = self.table.head(INSPECT_SAMPLE_ROWS);
        FileInspection {
            name: self.name.clone(),
            encoding: self.encoding,
            size_bytes: self.size_bytes,
            title: self.table.title().map(str::to_string),
            columns: self.table.columns().to_vec(),
            column_types: self.column_types(),
            row_count: self.table.row_count(),
            sample_rows: sample.records(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Loads a CSV file from disk.
///
/// Small files are read into memory once and parsed per candidate.
/// Files above `options.large_file_threshold_bytes` are streamed from disk
/// for each candidate and assembled in `options.batch_rows` batches; the
/// resulting table is the same either way.
///
/// # Errors
///
/// - `AppError::Io` if the file cannot be opened or read.
/// - `AppError::Decode` if no candidate encoding decodes the file.
/// - `AppError::CsvInvalid` for structural problems (empty file, row wider
///   than the header).
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<LoadedFile, AppError> {
    let size_bytes = std::fs::metadata(path)
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?
        .len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let (table, encoding) = if size_bytes > options.large_file_threshold_bytes {
        debug!(
            path = %path.display(),
            size_bytes,
            batch_rows = options.batch_rows,
            "Streaming large CSV in batches"
        );
        load_with_candidates(
            || {
                File::open(path)
                    .map(|f| BufReader::with_capacity(BUFFER_SIZE, f))
                    .map_err(|e| {
                        AppError::Io(format!("Failed to open {}: {}", path.display(), e))
                    })
            },
            options.detect_title,
            options.batch_rows,
        )?
    } else {
        let bytes = std::fs::read(path)
            .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        load_with_candidates(
            || Ok(Cursor::new(bytes.as_slice())),
            options.detect_title,
            usize::MAX,
        )?
    };

    Ok(LoadedFile {
        name,
        path: Some(path.to_path_buf()),
        encoding,
        size_bytes,
        table,
    })
}

/// Loads a CSV held in memory.
pub fn load_bytes(name: &str, bytes: &[u8], options: &LoadOptions) -> Result<LoadedFile, AppError> {
    let size_bytes = bytes.len() as u64;
    let batch_rows = if size_bytes > options.large_file_threshold_bytes {
        options.batch_rows
    } else {
        usize::MAX
    };
    let (table, encoding) =
        load_with_candidates(|| Ok(Cursor::new(bytes)), options.detect_title, batch_rows)?;

    Ok(LoadedFile {
        name: name.to_string(),
        path: None,
        encoding,
        size_bytes,
        table,
    })
}

/// Loads a CSV from any readable stream. The stream is buffered in full so
/// every candidate encoding can re-read it.
pub fn load_reader<R: Read>(
    name: &str,
    mut reader: R,
    options: &LoadOptions,
) -> Result<LoadedFile, AppError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", name, e)))?;
    load_bytes(name, &bytes, options)
}

// ─────────────────────────────────────────────────────────────────────────────
// Candidate Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one decode attempt.
enum Attempt {
    Loaded(Table),
    Undecodable,
}

fn load_with_candidates<F, R>(
    open: F,
    detect_title: bool,
    batch_rows: usize,
) -> Result<(Table, TextEncoding), AppError>
where
    F: Fn() -> Result<R, AppError>,
    R: BufRead,
{
    for encoding in CANDIDATE_ENCODINGS {
        match read_table(open()?, encoding, detect_title, batch_rows)? {
            Attempt::Loaded(table) => {
                debug!(
                    encoding = encoding.label(),
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "Loaded CSV"
                );
                return Ok((table, encoding));
            }
            Attempt::Undecodable => {
                debug!(encoding = encoding.label(), "Candidate encoding rejected");
            }
        }
    }

    Err(AppError::Decode {
        attempted: candidate_labels(),
    })
}

/// Reads one table under `encoding`, splitting off a title record if present.
///
/// The first record is parsed as CSV, so a quoted field may hold commas or
/// line breaks. A first record with exactly one non-empty field is a title
/// when `detect_title` is set; the next record is then the header.
fn read_table<R: BufRead>(
    mut source: R,
    encoding: TextEncoding,
    detect_title: bool,
    batch_rows: usize,
) -> Result<Attempt, AppError> {
    if encoding == TextEncoding::Utf8 {
        let head = source
            .fill_buf()
            .map_err(|e| AppError::Io(format!("Failed to read first line: {}", e)))?;
        if head.starts_with(UTF8_BOM) {
            source.consume(UTF8_BOM.len());
        }
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);
    let mut record = ByteRecord::new();

    if !next_record(&mut reader, &mut record)? {
        return Err(AppError::CsvInvalid("File is empty".into()));
    }

    let is_title =
        detect_title && record.len() == 1 && record.get(0).is_some_and(|field| !field.is_empty());
    let title = if is_title {
        let Some(text) = encoding.decode(&record[0]) else {
            return Ok(Attempt::Undecodable);
        };
        Some(text.into_owned())
    } else {
        None
    };
    if title.is_some() && !next_record(&mut reader, &mut record)? {
        return Err(AppError::CsvInvalid("CSV file has no header row".into()));
    }

    if record.is_empty() {
        return Err(AppError::CsvInvalid("CSV file has no header row".into()));
    }

    let mut headers = Vec::with_capacity(record.len());
    for field in record.iter() {
        match encoding.decode(field) {
            Some(text) => headers.push(text.into_owned()),
            None => return Ok(Attempt::Undecodable),
        }
    }
    let columns = normalize_headers(headers);
    let width = columns.len();

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut batch: Vec<Vec<Option<String>>> = Vec::new();
    let mut row_number: u64 = 0;

    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|e| AppError::CsvInvalid(format!("Failed to parse CSV row {}: {}", row_number + 1, e)))?;
        if !more {
            break;
        }
        row_number += 1;

        if record.len() > width {
            return Err(AppError::CsvInvalid(format!(
                "Row {} has {} fields, expected {}",
                row_number,
                record.len(),
                width
            )));
        }

        let mut cells: Vec<Option<String>> = Vec::with_capacity(width);
        for field in record.iter() {
            let Some(text) = encoding.decode(field) else {
                return Ok(Attempt::Undecodable);
            };
            cells.push(if is_null_token(&text) {
                None
            } else {
                Some(text.into_owned())
            });
        }
        cells.resize(width, None);
        batch.push(cells);

        if batch.len() >= batch_rows {
            rows.append(&mut batch);
            debug!(rows = rows.len(), "Assembled ingestion batch");
        }
    }
    rows.append(&mut batch);

    Ok(Attempt::Loaded(build_table(columns, rows).with_title(title)))
}

/// Reads the title or header record.
fn next_record<R: Read>(
    reader: &mut csv::Reader<R>,
    record: &mut ByteRecord,
) -> Result<bool, AppError> {
    reader
        .read_byte_record(record)
        .map_err(|e| AppError::CsvInvalid(format!("Failed to read CSV headers: {}", e)))
}

/// Runs the per-column type inference pass and converts raw cells.
fn build_table(columns: Vec<String>, raw_rows: Vec<Vec<Option<String>>>) -> Table {
    let dtypes: Vec<ColumnType> = (0..columns.len())
        .map(|idx| ColumnType::infer(raw_rows.iter().map(|row| &row[idx])))
        .collect();

    let rows: Vec<Vec<Value>> = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&dtypes)
                .map(|(cell, dtype)| dtype.parse(cell))
                .collect()
        })
        .collect();

    Table::with_types(columns, dtypes, rows)
}

/// Makes header names unique: blanks become `Unnamed: {i}`, repeats get
/// `.1`, `.2`, ... appended.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        if candidate != base {
            warn!(column = %base, renamed = %candidate, "Duplicate column name renamed");
        }
        seen.push(candidate);
    }
    seen
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
