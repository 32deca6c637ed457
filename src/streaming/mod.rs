//! Output plumbing.
//!
//! Every file the core produces goes through `AtomicFileWriter`, so a
//! failed or abandoned operation never leaves a partial artifact at the
//! destination path.

mod atomic_writer;

pub use atomic_writer::{write_atomic, AtomicFileWriter};
