//! CSV splitting, duplicate removal and merging.
//!
//! The engines (`split`, `dedup`, `merge`) work on in-memory `Table`s
//! produced by `ingest`. The `operations` module wires them to files on
//! disk, progress sinks and event sinks.

pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod ingest;
pub mod merge;
pub mod operations;
pub mod progress;
pub mod split;
pub mod streaming;
pub mod table;

pub use config::CoreConfig;
pub use error::AppError;
pub use events::{EventSink, OperationEvent, OperationHooks, OperationKind, OperationRecord};
pub use ingest::{load_bytes, load_path, load_reader, LoadOptions, LoadedFile, TextEncoding};
pub use progress::ProgressSink;
pub use table::{ColumnType, Table, Value};
