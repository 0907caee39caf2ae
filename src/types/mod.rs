//! Value types shared by records, filters and the reader.

mod fixed;
mod value;

pub use fixed::{format_unix_nanos, Price, Quantity, UnixNanos, FIXED_PRECISION_MAX};
pub use value::{ColumnType, ScalarValue};
