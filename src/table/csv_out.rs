//! Serializing a table back to CSV.

use std::io::Write;

use csv::{Terminator, WriterBuilder};

use crate::error::AppError;
use crate::ingest::TextEncoding;

use super::frame::Table;

/// Serializes `table` as CSV text in `encoding`.
///
/// The title, when present, is written as a one-field record before the
/// header, quoted only if it holds a comma, quote or line break.
/// Records end with `\n`. Quoting follows RFC 4180 (only when needed).
///
/// # Errors
///
/// Returns `AppError::Io` if the CSV writer fails and
/// `AppError::InvalidParameter` if some text cannot be represented in
/// `encoding`.
pub fn to_csv_bytes(table: &Table, encoding: TextEncoding) -> Result<Vec<u8>, AppError> {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(&mut buffer);

        if let Some(title) = table.title() {
            writer
                .write_record([title])
                .map_err(|e| AppError::Io(format!("Failed to write title line: {}", e)))?;
        }

        writer
            .write_record(table.columns())
            .map_err(|e| AppError::Io(format!("Failed to write CSV header: {}", e)))?;

        let mut cells: Vec<String> = Vec::with_capacity(table.column_count());
        for (idx, row) in table.rows().iter().enumerate() {
            cells.clear();
            cells.extend(row.iter().map(ToString::to_string));
            writer.write_record(&cells).map_err(|e| {
                AppError::Io(format!("Failed to write CSV row {}: {}", idx + 1, e))
            })?;
        }

        writer
            .flush()
            .map_err(|e| AppError::Io(format!("Failed to flush CSV writer: {}", e)))?;
    }

    // The csv writer only ever sees &str input, so the buffer is UTF-8
    let text = String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(format!("CSV buffer is not UTF-8: {}", e)))?;
    encoding.encode(&text).map(|bytes| bytes.into_owned())
}

/// Serializes `table` and writes it to `sink`.
pub fn write_csv<W: Write>(
    table: &Table,
    encoding: TextEncoding,
    sink: &mut W,
) -> Result<(), AppError> {
    let bytes = to_csv_bytes(table, encoding)?;
    sink.write_all(&bytes)
        .map_err(|e| AppError::Io(format!("Failed to write CSV output: {}", e)))
}
