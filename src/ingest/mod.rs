//! Shared CSV ingestion.
//!
//! Every engine loads its input through this module: encoding fallback over
//! a fixed candidate list, optional title-row detection, a single type
//! inference pass per column, and batched assembly for large sources.

mod encoding;
mod loader;

pub use encoding::{TextEncoding, CANDIDATE_ENCODINGS};
pub use loader::{load_bytes, load_path, load_reader, FileInspection, LoadOptions, LoadedFile};
