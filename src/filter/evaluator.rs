//! Vectorized filter evaluation over Arrow record batches.

use std::ops::Bound;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::compute::kernels::boolean::{and, or};
use arrow::compute::kernels::cmp::{eq, gt, gt_eq, lt, lt_eq};
use arrow::datatypes::Float64Type;
use arrow::error::{ArrowError, Result as ArrowResult};
use arrow::record_batch::RecordBatch;

use crate::filter::FilterExpr;
use crate::types::ScalarValue;

/// Evaluates bound filter expressions against record batches.
///
/// Expressions must have been bound against the batch schema first, so every
/// literal already has the column's type. Rows where a comparison is null are
/// treated as not matching.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluates the conjunction of `exprs`, returning a null-free mask.
    ///
    /// # Errors
    ///
    /// Returns an Arrow error if a referenced column is missing from the batch
    /// or a comparison kernel fails.
    pub fn evaluate_all(exprs: &[FilterExpr], batch: &RecordBatch) -> ArrowResult<BooleanArray> {
        let mut result: Option<BooleanArray> = None;
        for expr in exprs {
            let mask = Self::evaluate(expr, batch)?;
            result = Some(match result {
                Some(prev) => and(&prev, &mask)?,
                None => mask,
            });
        }
        let mask = result.unwrap_or_else(|| BooleanArray::from(vec![true; batch.num_rows()]));
        Ok(Self::nulls_as_false(mask))
    }

    /// Evaluates a single expression.
    ///
    /// # Errors
    ///
    /// Returns an Arrow error if a referenced column is missing from the batch
    /// or a comparison kernel fails.
    pub fn evaluate(expr: &FilterExpr, batch: &RecordBatch) -> ArrowResult<BooleanArray> {
        let (col, mask) = match expr {
            FilterExpr::Eq { column, value } => {
                let col = Self::column(batch, column)?;
                let mask = eq(&col, &value.to_arrow_scalar())?;
                (col, mask)
            }
            FilterExpr::Range {
                column,
                lower,
                upper,
            } => {
                let col = Self::column(batch, column)?;
                let lower_mask = match lower {
                    Bound::Included(v) => Some(gt_eq(&col, &v.to_arrow_scalar())?),
                    Bound::Excluded(v) => Some(gt(&col, &v.to_arrow_scalar())?),
                    Bound::Unbounded => None,
                };
                let upper_mask = match upper {
                    Bound::Included(v) => Some(lt_eq(&col, &v.to_arrow_scalar())?),
                    Bound::Excluded(v) => Some(lt(&col, &v.to_arrow_scalar())?),
                    Bound::Unbounded => None,
                };
                let mask = match (lower_mask, upper_mask) {
                    (Some(l), Some(u)) => and(&l, &u)?,
                    (Some(m), None) | (None, Some(m)) => m,
                    (None, None) => BooleanArray::from(vec![true; batch.num_rows()]),
                };
                (col, mask)
            }
            FilterExpr::In { column, values } => {
                let col = Self::column(batch, column)?;
                let mask = Self::evaluate_in(&col, values, batch.num_rows())?;
                (col, mask)
            }
            FilterExpr::And(exprs) => return Self::evaluate_all(exprs, batch),
        };
        Self::exclude_nan(&col, mask)
    }

    /// The comparison kernels order floats totally, placing NaN above every
    /// number. NaN must never satisfy a predicate, matching the row-group
    /// statistics that leave NaN out of min/max.
    fn exclude_nan(col: &ArrayRef, mask: BooleanArray) -> ArrowResult<BooleanArray> {
        match col.as_primitive_opt::<Float64Type>() {
            Some(values) if values.values().iter().any(|v| v.is_nan()) => {
                let not_nan = BooleanArray::from_unary(values, |v| !v.is_nan());
                and(&mask, &not_nan)
            }
            _ => Ok(mask),
        }
    }

    fn evaluate_in(col: &ArrayRef, values: &[ScalarValue], num_rows: usize) -> ArrowResult<BooleanArray> {
        let mut result: Option<BooleanArray> = None;
        for value in values {
            let mask = eq(col, &value.to_arrow_scalar())?;
            result = Some(match result {
                Some(prev) => or(&prev, &mask)?,
                None => mask,
            });
        }
        Ok(result.unwrap_or_else(|| BooleanArray::from(vec![false; num_rows])))
    }

    fn column(batch: &RecordBatch, name: &str) -> ArrowResult<ArrayRef> {
        batch.column_by_name(name).cloned().ok_or_else(|| {
            ArrowError::InvalidArgumentError(format!("Column not found: {name}"))
        })
    }

    fn nulls_as_false(mask: BooleanArray) -> BooleanArray {
        if mask.null_count() == 0 {
            return mask;
        }
        mask.iter().map(|v| Some(v.unwrap_or(false))).collect()
    }
}
