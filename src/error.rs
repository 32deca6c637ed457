use serde::Serialize;
use thiserror::Error;

/// User-friendly error presentation for the boundary layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Ingestion ─────────────────────────────────────────────────────────────
    #[error("Could not decode file with any of these encodings: {}", attempted.join(", "))]
    Decode { attempted: Vec<String> },

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    // ── Parameters ────────────────────────────────────────────────────────────
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown column(s): {}", missing.join(", "))]
    InvalidColumns { missing: Vec<String> },

    #[error("Operation needs at least {required} file(s), {registered} registered")]
    NoFiles { required: usize, registered: usize },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    // ── Execution ─────────────────────────────────────────────────────────────
    #[error("Split failed: {0}")]
    SplitFailed(String),

    #[error("Duplicate removal failed: {0}")]
    ResolveFailed(String),

    #[error("Merge failed: {0}")]
    MergeFailed(String),

    #[error("I/O error: {0}")]
    Io(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an `InvalidColumns` error from any list of column names.
    pub fn invalid_columns<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::InvalidColumns {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Converts the error into a presentation suitable for UI display.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── Ingestion ─────────────────────────────────────────────────────
            AppError::Decode { attempted } => ErrorPresentation {
                title: "Unreadable File".into(),
                message: format!(
                    "The file could not be read with any supported encoding ({}).",
                    attempted.join(", ")
                ),
                action: Some("Re-save the file as UTF-8 and upload it again".into()),
            },

            AppError::CsvInvalid(msg) => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: format!("The CSV file has a formatting problem: {}", msg),
                action: Some("Fix the CSV file and try again".into()),
            },

            // ── Parameters ────────────────────────────────────────────────────
            AppError::InvalidParameter(msg) => ErrorPresentation {
                title: "Invalid Option".into(),
                message: msg.clone(),
                action: Some("Check the selected options".into()),
            },

            AppError::InvalidColumns { missing } => ErrorPresentation {
                title: "Unknown Columns".into(),
                message: format!(
                    "These columns are not present in every file: {}",
                    missing.join(", ")
                ),
                action: Some("Pick columns that exist in the uploaded files".into()),
            },

            AppError::NoFiles { required, .. } => ErrorPresentation {
                title: "Not Enough Files".into(),
                message: format!("Upload at least {} file(s) to continue.", required),
                action: Some("Add files".into()),
            },

            AppError::UnsupportedOperation(msg) => ErrorPresentation {
                title: "Not Supported".into(),
                message: msg.clone(),
                action: None,
            },

            // ── Execution ─────────────────────────────────────────────────────
            AppError::SplitFailed(msg) => ErrorPresentation {
                title: "Split Failed".into(),
                message: format!("The file could not be split: {}", msg),
                action: Some("Try again".into()),
            },

            AppError::ResolveFailed(msg) => ErrorPresentation {
                title: "Duplicate Removal Failed".into(),
                message: format!("Duplicates could not be removed: {}", msg),
                action: Some("Try again".into()),
            },

            AppError::MergeFailed(msg) => ErrorPresentation {
                title: "Merge Failed".into(),
                message: format!("The files could not be merged: {}", msg),
                action: Some("Check the join columns and try again".into()),
            },

            AppError::Io(_) => ErrorPresentation {
                title: "File Error".into(),
                message: "A file could not be read or written.".into(),
                action: Some("Try again".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }
}

// Lets a boundary layer return AppError directly as a JSON body
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}
