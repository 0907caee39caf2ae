//! Column types and scalar values used by filters and record schemas.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, Scalar, StringArray, UInt64Array,
};
use serde::{Deserialize, Serialize};

/// Column types that records and filters can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit unsigned integer (timestamps).
    UInt64,
    /// 64-bit floating point (prices, sizes).
    Float64,
    /// UTF-8 string.
    Utf8,
    /// Boolean.
    Boolean,
}

impl ColumnType {
    /// Returns the display name of the type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "INT64",
            ColumnType::UInt64 => "UINT64",
            ColumnType::Float64 => "FLOAT64",
            ColumnType::Utf8 => "UTF8",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// Returns whether min/max statistics of this type can prune row groups.
    #[must_use]
    pub fn is_prunable(&self) -> bool {
        matches!(
            self,
            ColumnType::Int64 | ColumnType::UInt64 | ColumnType::Float64
        )
    }

    /// Converts to an Arrow data type.
    #[must_use]
    pub fn to_arrow(&self) -> arrow::datatypes::DataType {
        match self {
            ColumnType::Int64 => arrow::datatypes::DataType::Int64,
            ColumnType::UInt64 => arrow::datatypes::DataType::UInt64,
            ColumnType::Float64 => arrow::datatypes::DataType::Float64,
            ColumnType::Utf8 => arrow::datatypes::DataType::Utf8,
            ColumnType::Boolean => arrow::datatypes::DataType::Boolean,
        }
    }

    /// Converts from an Arrow data type.
    ///
    /// Returns None for Arrow types that filters cannot address.
    #[must_use]
    pub fn from_arrow(arrow_type: &arrow::datatypes::DataType) -> Option<Self> {
        match arrow_type {
            arrow::datatypes::DataType::Int64 => Some(ColumnType::Int64),
            arrow::datatypes::DataType::UInt64 => Some(ColumnType::UInt64),
            arrow::datatypes::DataType::Float64 => Some(ColumnType::Float64),
            arrow::datatypes::DataType::Utf8 => Some(ColumnType::Utf8),
            arrow::datatypes::DataType::Boolean => Some(ColumnType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal compared against column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    /// 64-bit signed integer value.
    Int64(i64),
    /// 64-bit unsigned integer value.
    UInt64(u64),
    /// 64-bit floating point value.
    Float64(f64),
    /// String value.
    Utf8(String),
    /// Boolean value.
    Boolean(bool),
}

impl ScalarValue {
    /// Returns the natural column type of this value.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            ScalarValue::Int64(_) => ColumnType::Int64,
            ScalarValue::UInt64(_) => ColumnType::UInt64,
            ScalarValue::Float64(_) => ColumnType::Float64,
            ScalarValue::Utf8(_) => ColumnType::Utf8,
            ScalarValue::Boolean(_) => ColumnType::Boolean,
        }
    }

    /// Converts this value so it can be compared with a column of `target` type.
    ///
    /// Integers widen to floats and convert between signed and unsigned when the
    /// value fits. Floats never narrow to integers. Returns None when the
    /// conversion is not allowed.
    #[must_use]
    pub fn coerce_to(&self, target: ColumnType) -> Option<ScalarValue> {
        match (self, target) {
            (ScalarValue::Int64(v), ColumnType::Int64) => Some(ScalarValue::Int64(*v)),
            (ScalarValue::Int64(v), ColumnType::UInt64) => {
                u64::try_from(*v).ok().map(ScalarValue::UInt64)
            }
            (ScalarValue::Int64(v), ColumnType::Float64) => Some(ScalarValue::Float64(*v as f64)),
            (ScalarValue::UInt64(v), ColumnType::UInt64) => Some(ScalarValue::UInt64(*v)),
            (ScalarValue::UInt64(v), ColumnType::Int64) => {
                i64::try_from(*v).ok().map(ScalarValue::Int64)
            }
            (ScalarValue::UInt64(v), ColumnType::Float64) => {
                Some(ScalarValue::Float64(*v as f64))
            }
            (ScalarValue::Float64(v), ColumnType::Float64) => Some(ScalarValue::Float64(*v)),
            (ScalarValue::Utf8(v), ColumnType::Utf8) => Some(ScalarValue::Utf8(v.clone())),
            (ScalarValue::Boolean(v), ColumnType::Boolean) => Some(ScalarValue::Boolean(*v)),
            _ => None,
        }
    }

    /// Compares two values of the same variant.
    ///
    /// Returns None on a variant mismatch or a NaN operand.
    #[must_use]
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Int64(a), ScalarValue::Int64(b)) => Some(a.cmp(b)),
            (ScalarValue::UInt64(a), ScalarValue::UInt64(b)) => Some(a.cmp(b)),
            (ScalarValue::Float64(a), ScalarValue::Float64(b)) => a.partial_cmp(b),
            (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => Some(a.cmp(b)),
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Builds a one-element Arrow scalar for comparison kernels.
    #[must_use]
    pub fn to_arrow_scalar(&self) -> Scalar<ArrayRef> {
        let array: ArrayRef = match self {
            ScalarValue::Int64(v) => Arc::new(Int64Array::from(vec![*v])),
            ScalarValue::UInt64(v) => Arc::new(UInt64Array::from(vec![*v])),
            ScalarValue::Float64(v) => Arc::new(Float64Array::from(vec![*v])),
            ScalarValue::Utf8(v) => Arc::new(StringArray::from(vec![v.as_str()])),
            ScalarValue::Boolean(v) => Arc::new(BooleanArray::from(vec![*v])),
        };
        Scalar::new(array)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::UInt64(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v:?}"),
            ScalarValue::Utf8(v) => write!(f, "'{}'", v.replace('\'', "''")),
            ScalarValue::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<u64> for ScalarValue {
    fn from(v: u64) -> Self {
        ScalarValue::UInt64(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float64(v)
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Boolean(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Utf8(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Utf8(v)
    }
}
