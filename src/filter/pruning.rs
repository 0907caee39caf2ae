//! Row-group pruning from column chunk statistics.
//!
//! A row group is skipped only when its min/max statistics prove that no row
//! can satisfy the filter set. Missing statistics, unsupported column types or
//! NaN bounds keep the row group.

use std::cmp::Ordering;
use std::ops::Bound;

use arrow::datatypes::Schema;
use parquet::file::metadata::{ParquetMetaData, RowGroupMetaData};
use parquet::file::statistics::Statistics;

use crate::filter::FilterExpr;
use crate::types::{ColumnType, ScalarValue};

/// Returns the indices of row groups that may contain matching rows.
#[must_use]
pub fn prune_row_groups(
    metadata: &ParquetMetaData,
    schema: &Schema,
    filters: &[FilterExpr],
) -> Vec<usize> {
    metadata
        .row_groups()
        .iter()
        .enumerate()
        .filter(|(_, rg)| rg.num_rows() > 0)
        .filter(|(_, rg)| {
            let stats = RowGroupStats { rg, schema };
            filters.iter().all(|f| stats.may_match(f))
        })
        .map(|(i, _)| i)
        .collect()
}

struct RowGroupStats<'a> {
    rg: &'a RowGroupMetaData,
    schema: &'a Schema,
}

impl RowGroupStats<'_> {
    fn may_match(&self, expr: &FilterExpr) -> bool {
        match expr {
            FilterExpr::Eq { column, value } => self.may_contain(column, value),
            FilterExpr::Range {
                column,
                lower,
                upper,
            } => {
                let Some((min, max)) = self.min_max(column) else {
                    return true;
                };
                let lower_ok = match lower {
                    Bound::Included(v) => !matches!(max.compare(v), Some(Ordering::Less)),
                    Bound::Excluded(v) => {
                        !matches!(max.compare(v), Some(Ordering::Less | Ordering::Equal))
                    }
                    Bound::Unbounded => true,
                };
                let upper_ok = match upper {
                    Bound::Included(v) => !matches!(min.compare(v), Some(Ordering::Greater)),
                    Bound::Excluded(v) => {
                        !matches!(min.compare(v), Some(Ordering::Greater | Ordering::Equal))
                    }
                    Bound::Unbounded => true,
                };
                lower_ok && upper_ok
            }
            FilterExpr::In { column, values } => values.iter().any(|v| self.may_contain(column, v)),
            FilterExpr::And(exprs) => exprs.iter().all(|e| self.may_match(e)),
        }
    }

    fn may_contain(&self, column: &str, value: &ScalarValue) -> bool {
        let Some((min, max)) = self.min_max(column) else {
            return true;
        };
        !matches!(value.compare(&min), Some(Ordering::Less))
            && !matches!(value.compare(&max), Some(Ordering::Greater))
    }

    fn min_max(&self, column: &str) -> Option<(ScalarValue, ScalarValue)> {
        let field = self.schema.field_with_name(column).ok()?;
        let ty = ColumnType::from_arrow(field.data_type())?;
        if !ty.is_prunable() {
            return None;
        }
        let chunk = self
            .rg
            .columns()
            .iter()
            .find(|c| c.column_descr().name() == column)?;
        match (ty, chunk.statistics()?) {
            (ColumnType::Int64, Statistics::Int64(s)) => Some((
                ScalarValue::Int64(*s.min_opt()?),
                ScalarValue::Int64(*s.max_opt()?),
            )),
            // Unsigned columns are stored as INT64 and compared bit-for-bit.
            (ColumnType::UInt64, Statistics::Int64(s)) => Some((
                ScalarValue::UInt64(*s.min_opt()? as u64),
                ScalarValue::UInt64(*s.max_opt()? as u64),
            )),
            (ColumnType::Float64, Statistics::Double(s)) => {
                let (min, max) = (*s.min_opt()?, *s.max_opt()?);
                if min.is_nan() || max.is_nan() {
                    return None;
                }
                Some((ScalarValue::Float64(min), ScalarValue::Float64(max)))
            }
            _ => None,
        }
    }
}
