//! Fixed-layout records decoded from columnar files.
//!
//! Each record type implements [`ColumnarRecord`], which names the columns the
//! record is built from and converts Arrow batches to records and back. The
//! reader validates a file against [`ColumnarRecord::columns`] before scanning,
//! so `decode_batch` can assume every column exists with the declared type.

mod bar;
pub mod metadata;
mod quote;

pub use bar::{Bar, BarValues};
pub use metadata::InstrumentContext;
pub use quote::QuoteTick;

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, AsArray, PrimitiveArray};
use arrow::datatypes::{ArrowPrimitiveType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{Result, TickscanError};
use crate::types::ColumnType;

/// A column a record type reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name in the file schema.
    pub name: &'static str,
    /// Expected column type.
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Creates a column specification.
    #[must_use]
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

/// A fixed-layout record that can be decoded from and encoded to a columnar batch.
pub trait ColumnarRecord: Copy + Send + Sync + 'static {
    /// Short record name used in logs and errors.
    const NAME: &'static str;

    /// Per-file values decoded once from the file metadata.
    type Context: Send + Sync;

    /// Columns the record is built from.
    fn columns() -> &'static [ColumnSpec];

    /// Decodes the per-file context from the file's key/value metadata.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` when a required key is missing or malformed.
    fn decode_context(metadata: &HashMap<String, String>) -> Result<Self::Context>;

    /// Appends one record per batch row to `out`, in row order.
    ///
    /// # Errors
    ///
    /// Returns `CorruptData` when a value violates the record's invariants.
    fn decode_batch(batch: &RecordBatch, ctx: &Self::Context, out: &mut Vec<Self>)
        -> Result<()>;

    /// Returns the key/value metadata to store alongside `records`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `records` cannot share one set of
    /// file metadata.
    fn file_metadata(records: &[Self]) -> Result<HashMap<String, String>> {
        let _ = records;
        Ok(HashMap::new())
    }

    /// Encodes records into a batch matching [`record_schema`].
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if the batch cannot be assembled.
    fn encode_batch(records: &[Self], schema: SchemaRef) -> Result<RecordBatch>;
}

/// Builds the Arrow schema for a record type with the given metadata.
#[must_use]
pub fn record_schema<R: ColumnarRecord>(metadata: HashMap<String, String>) -> SchemaRef {
    let fields: Vec<Field> = R::columns()
        .iter()
        .map(|c| Field::new(c.name, c.column_type.to_arrow(), false))
        .collect();
    Arc::new(Schema::new_with_metadata(fields, metadata))
}

/// Checks that `schema` carries every column of `R` and returns their indices.
///
/// The returned indices are in file order, ready for a projection mask.
///
/// # Errors
///
/// Returns `SchemaMismatch` if a column is missing or has another type.
pub fn validate_columns<R: ColumnarRecord>(schema: &Schema) -> Result<Vec<usize>> {
    let mut indices = Vec::with_capacity(R::columns().len());
    for spec in R::columns() {
        let index = schema.index_of(spec.name).map_err(|_| {
            TickscanError::SchemaMismatch(format!(
                "{} requires column '{}' which the file does not contain",
                R::NAME,
                spec.name
            ))
        })?;
        let actual = schema.field(index).data_type();
        if ColumnType::from_arrow(actual) != Some(spec.column_type) {
            return Err(TickscanError::SchemaMismatch(format!(
                "{} column '{}' must be {}, file has {actual}",
                R::NAME,
                spec.name,
                spec.column_type
            )));
        }
        indices.push(index);
    }
    indices.sort_unstable();
    Ok(indices)
}

/// Returns a non-null primitive column of the batch by name.
///
/// # Errors
///
/// Returns `CorruptData` if the column is absent, has another type, or
/// contains nulls.
pub fn primitive_column<'a, T: ArrowPrimitiveType>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a PrimitiveArray<T>> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| TickscanError::CorruptData(format!("batch has no column '{name}'")))?;
    let array = column.as_primitive_opt::<T>().ok_or_else(|| {
        TickscanError::CorruptData(format!(
            "column '{name}' decoded as {}",
            column.data_type()
        ))
    })?;
    if array.null_count() > 0 {
        return Err(TickscanError::CorruptData(format!(
            "column '{name}' contains {} null values",
            array.null_count()
        )));
    }
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, UInt64Array};
    use arrow::datatypes::{DataType, Float64Type};

    #[test]
    fn test_validate_columns_reports_missing() {
        let schema = Schema::new(vec![Field::new("bid_price", DataType::Float64, false)]);
        let err = validate_columns::<QuoteTick>(&schema).unwrap_err();
        assert!(matches!(err, TickscanError::SchemaMismatch(_)));
        assert!(err.to_string().contains("ask_price"));
    }

    #[test]
    fn test_validate_columns_reports_wrong_type() {
        let schema = record_schema::<QuoteTick>(HashMap::new());
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let name = fields[0].name().clone();
        fields[0] = Field::new(name, DataType::Utf8, false);
        let err = validate_columns::<QuoteTick>(&Schema::new(fields)).unwrap_err();
        assert!(err.to_string().contains("must be FLOAT64"));
    }

    #[test]
    fn test_validate_columns_sorted() {
        let schema = record_schema::<QuoteTick>(HashMap::new());
        let indices = validate_columns::<QuoteTick>(&schema).unwrap();
        assert_eq!(indices, (0..QuoteTick::columns().len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_primitive_column_rejects_nulls() {
        let schema = Arc::new(Schema::new(vec![Field::new("p", DataType::Float64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Float64Array::from(vec![Some(1.0), None]))],
        )
        .unwrap();
        let err = primitive_column::<Float64Type>(&batch, "p").unwrap_err();
        assert!(matches!(err, TickscanError::CorruptData(_)));
    }

    #[test]
    fn test_primitive_column_rejects_type() {
        let schema = Arc::new(Schema::new(vec![Field::new("t", DataType::UInt64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(UInt64Array::from(vec![1u64]))]).unwrap();
        assert!(primitive_column::<Float64Type>(&batch, "t").is_err());
        assert!(primitive_column::<Float64Type>(&batch, "missing").is_err());
    }
}
