//! Predicate filters pushed down into columnar scans.
//!
//! A filter set is a slice of [`FilterExpr`] combined by logical AND. Filters
//! are bound against the file schema before the scan starts
//! ([`bind_filters`]): column references are resolved, literals are coerced to
//! the column type, and every mismatch surfaces as `SchemaMismatch` before any
//! row is read.

mod evaluator;
mod grammar;
pub mod pruning;

pub use evaluator::FilterEvaluator;
pub use grammar::parse_filters;

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;

use arrow::datatypes::Schema;

use crate::error::{Result, TickscanError};
use crate::types::{ColumnType, ScalarValue};

/// A predicate over column values.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `column = value`.
    Eq { column: String, value: ScalarValue },
    /// `lower <op> column <op> upper`; either bound may be open.
    Range {
        column: String,
        lower: Bound<ScalarValue>,
        upper: Bound<ScalarValue>,
    },
    /// `column IN (values...)`; an empty list matches nothing.
    In {
        column: String,
        values: Vec<ScalarValue>,
    },
    /// All sub-expressions hold; an empty conjunction matches everything.
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    /// `column = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        FilterExpr::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// `column > value`.
    pub fn gt(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::range(column, Bound::Excluded(value.into()), Bound::Unbounded)
    }

    /// `column >= value`.
    pub fn gt_eq(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::range(column, Bound::Included(value.into()), Bound::Unbounded)
    }

    /// `column < value`.
    pub fn lt(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::range(column, Bound::Unbounded, Bound::Excluded(value.into()))
    }

    /// `column <= value`.
    pub fn lt_eq(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Self::range(column, Bound::Unbounded, Bound::Included(value.into()))
    }

    /// `low <= column <= high`.
    pub fn between(
        column: impl Into<String>,
        low: impl Into<ScalarValue>,
        high: impl Into<ScalarValue>,
    ) -> Self {
        Self::range(
            column,
            Bound::Included(low.into()),
            Bound::Included(high.into()),
        )
    }

    /// Range with explicit bounds.
    pub fn range(
        column: impl Into<String>,
        lower: Bound<ScalarValue>,
        upper: Bound<ScalarValue>,
    ) -> Self {
        FilterExpr::Range {
            column: column.into(),
            lower,
            upper,
        }
    }

    /// `column IN (values...)`.
    pub fn is_in<V: Into<ScalarValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        FilterExpr::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction of expressions.
    #[must_use]
    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And(exprs)
    }

    /// Resolves column references and coerces literals against `schema`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` for unknown columns, unsupported column types
    /// and literals that cannot be compared with the column.
    pub fn bind(&self, schema: &Schema, columns: &mut BTreeSet<usize>) -> Result<FilterExpr> {
        match self {
            FilterExpr::Eq { column, value } => {
                let ty = resolve_column(schema, column, columns)?;
                Ok(FilterExpr::Eq {
                    column: column.clone(),
                    value: coerce(column, ty, value)?,
                })
            }
            FilterExpr::Range {
                column,
                lower,
                upper,
            } => {
                let ty = resolve_column(schema, column, columns)?;
                if ty == ColumnType::Boolean {
                    return Err(TickscanError::SchemaMismatch(format!(
                        "range filter on column '{column}' requires an ordered type, found {ty}"
                    )));
                }
                Ok(FilterExpr::Range {
                    column: column.clone(),
                    lower: coerce_bound(column, ty, lower)?,
                    upper: coerce_bound(column, ty, upper)?,
                })
            }
            FilterExpr::In { column, values } => {
                let ty = resolve_column(schema, column, columns)?;
                let values = values
                    .iter()
                    .map(|v| coerce(column, ty, v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(FilterExpr::In {
                    column: column.clone(),
                    values,
                })
            }
            FilterExpr::And(exprs) => Ok(FilterExpr::And(
                exprs
                    .iter()
                    .map(|e| e.bind(schema, columns))
                    .collect::<Result<Vec<_>>>()?,
            )),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Eq { column, value } => write!(f, "{column} = {value}"),
            FilterExpr::Range {
                column,
                lower,
                upper,
            } => {
                let mut parts = Vec::with_capacity(2);
                match lower {
                    Bound::Included(v) => parts.push(format!("{column} >= {v}")),
                    Bound::Excluded(v) => parts.push(format!("{column} > {v}")),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(v) => parts.push(format!("{column} <= {v}")),
                    Bound::Excluded(v) => parts.push(format!("{column} < {v}")),
                    Bound::Unbounded => {}
                }
                if parts.is_empty() {
                    write!(f, "TRUE")
                } else {
                    write!(f, "{}", parts.join(" AND "))
                }
            }
            FilterExpr::In { column, values } => {
                let list: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{column} IN ({})", list.join(", "))
            }
            FilterExpr::And(exprs) => {
                let list: Vec<String> = exprs.iter().map(|e| format!("({e})")).collect();
                write!(f, "{}", list.join(" AND "))
            }
        }
    }
}

/// Filters bound to a file schema, ready for evaluation and pruning.
#[derive(Debug, Clone, Default)]
pub struct BoundFilters {
    exprs: Vec<FilterExpr>,
    columns: Vec<usize>,
}

impl BoundFilters {
    /// Returns the bound expressions.
    #[must_use]
    pub fn exprs(&self) -> &[FilterExpr] {
        &self.exprs
    }

    /// Returns the sorted, de-duplicated schema indices the filters read.
    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Returns true if no filter was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// Binds a filter set against `schema`.
///
/// # Errors
///
/// Returns `SchemaMismatch` if any expression does not fit the schema.
pub fn bind_filters(filters: &[FilterExpr], schema: &Schema) -> Result<BoundFilters> {
    let mut columns = BTreeSet::new();
    let exprs = filters
        .iter()
        .map(|f| f.bind(schema, &mut columns))
        .collect::<Result<Vec<_>>>()?;
    Ok(BoundFilters {
        exprs,
        columns: columns.into_iter().collect(),
    })
}

fn resolve_column(schema: &Schema, column: &str, columns: &mut BTreeSet<usize>) -> Result<ColumnType> {
    let index = schema.index_of(column).map_err(|_| {
        TickscanError::SchemaMismatch(format!("filter references unknown column '{column}'"))
    })?;
    let arrow_type = schema.field(index).data_type();
    let ty = ColumnType::from_arrow(arrow_type).ok_or_else(|| {
        TickscanError::SchemaMismatch(format!(
            "column '{column}' has type {arrow_type} which filters do not support"
        ))
    })?;
    columns.insert(index);
    Ok(ty)
}

fn coerce(column: &str, ty: ColumnType, value: &ScalarValue) -> Result<ScalarValue> {
    value.coerce_to(ty).ok_or_else(|| {
        TickscanError::SchemaMismatch(format!(
            "cannot compare column '{column}' of type {ty} with {} literal {value}",
            value.column_type()
        ))
    })
}

fn coerce_bound(
    column: &str,
    ty: ColumnType,
    bound: &Bound<ScalarValue>,
) -> Result<Bound<ScalarValue>> {
    Ok(match bound {
        Bound::Included(v) => Bound::Included(coerce(column, ty, v)?),
        Bound::Excluded(v) => Bound::Excluded(coerce(column, ty, v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}
