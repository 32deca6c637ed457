//! In-memory tabular data shared by the split, dedup and merge engines.
//!
//! A `Table` is immutable from the outside: every operation returns a new
//! table rather than mutating its input.

mod csv_out;
mod frame;
mod ops;
mod value;

pub use csv_out::{to_csv_bytes, write_csv};
pub use frame::{Record, Table};
pub use ops::{concat, join, JoinType, Suffixes};
pub(crate) use ops::concat_each;
pub use value::{is_null_token, parse_datetime, ColumnType, Value, NULL_TOKENS};
