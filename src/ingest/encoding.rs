//! Candidate text encodings for uploaded CSVs.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// UTF-8 BOM bytes.
pub(crate) const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Fixed decode order. The first candidate that reads the whole file wins.
pub const CANDIDATE_ENCODINGS: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Iso8859_1,
    TextEncoding::Windows1252,
];

/// A text encoding the loader knows how to try.
///
/// `Latin1` and `Iso8859_1` are the same byte-to-code-point mapping under two
/// labels; both are kept so the reported label matches the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin1")]
    Latin1,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
    #[serde(rename = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Iso8859_1 => "iso-8859-1",
            TextEncoding::Windows1252 => "cp1252",
        }
    }

    /// Decodes `bytes` strictly. `None` means the bytes are not valid in
    /// this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            TextEncoding::Utf8 => UTF_8.decode_without_bom_handling_and_without_replacement(bytes),
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                Some(encoding_rs::mem::decode_latin1(bytes))
            }
            TextEncoding::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }

    /// Encodes `text` for output in this encoding.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidParameter` when `text` holds characters the
    /// encoding cannot represent.
    pub fn encode(self, text: &str) -> Result<Cow<'_, [u8]>, AppError> {
        match self {
            TextEncoding::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
            TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
                if encoding_rs::mem::is_str_latin1(text) {
                    Ok(encoding_rs::mem::encode_latin1_lossy(text))
                } else {
                    Err(self.unmappable())
                }
            }
            TextEncoding::Windows1252 => {
                let (bytes, _, had_unmappable) = WINDOWS_1252.encode(text);
                if had_unmappable {
                    Err(self.unmappable())
                } else {
                    Ok(bytes)
                }
            }
        }
    }

    fn unmappable(self) -> AppError {
        AppError::InvalidParameter(format!(
            "Text contains characters that cannot be written as {}",
            self.label()
        ))
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Labels of every candidate, in try order.
pub(crate) fn candidate_labels() -> Vec<String> {
    CANDIDATE_ENCODINGS
        .iter()
        .map(|e| e.label().to_string())
        .collect()
}
