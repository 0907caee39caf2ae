//! Row-group scans with filter and projection pushdown.

use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::{
    ArrowPredicate, ArrowPredicateFn, ArrowReaderMetadata, ParquetRecordBatchReader,
    ParquetRecordBatchReaderBuilder, RowFilter,
};
use parquet::arrow::ProjectionMask;
use rayon::prelude::*;

use super::open_file;
use crate::error::Result;
use crate::filter::{BoundFilters, FilterEvaluator};
use crate::records::ColumnarRecord;

/// A validated scan over a set of row groups.
pub(crate) struct ScanPlan {
    pub metadata: ArrowReaderMetadata,
    /// Schema indices of the record columns, sorted.
    pub projection: Vec<usize>,
    pub filters: BoundFilters,
    /// Row groups to read, ascending.
    pub row_groups: Vec<usize>,
    pub batch_size: usize,
}

impl ScanPlan {
    /// Reads every planned row group from an already open file.
    pub fn scan_sequential<R: ColumnarRecord>(&self, file: File, ctx: &R::Context) -> Result<Vec<R>> {
        if self.row_groups.is_empty() {
            return Ok(Vec::new());
        }
        self.scan_row_groups(file, self.row_groups.clone(), ctx)
    }

    /// Reads each planned row group on the current rayon pool.
    ///
    /// Every task opens its own handle. Results are concatenated in row-group
    /// order so the output matches a sequential scan.
    pub fn scan_parallel<R: ColumnarRecord>(&self, path: &Path, ctx: &R::Context) -> Result<Vec<R>> {
        let parts: Vec<Vec<R>> = self
            .row_groups
            .par_iter()
            .map(|&rg| {
                let file = open_file(path)?;
                self.scan_row_groups(file, vec![rg], ctx)
            })
            .collect::<Result<_>>()?;

        let total = parts.iter().map(Vec::len).sum();
        let mut records = Vec::with_capacity(total);
        for part in parts {
            records.extend(part);
        }
        Ok(records)
    }

    fn scan_row_groups<R: ColumnarRecord>(
        &self,
        file: File,
        row_groups: Vec<usize>,
        ctx: &R::Context,
    ) -> Result<Vec<R>> {
        let reader = self.build_reader(file, row_groups)?;
        let mut records = Vec::new();
        for batch in reader {
            R::decode_batch(&batch?, ctx, &mut records)?;
        }
        Ok(records)
    }

    fn build_reader(&self, file: File, row_groups: Vec<usize>) -> Result<ParquetRecordBatchReader> {
        let parquet_schema = self.metadata.parquet_schema();
        let mut builder = ParquetRecordBatchReaderBuilder::new_with_metadata(file, self.metadata.clone())
            .with_projection(ProjectionMask::roots(
                parquet_schema,
                self.projection.iter().copied(),
            ))
            .with_row_groups(row_groups)
            .with_batch_size(self.batch_size);

        if !self.filters.is_empty() {
            // An empty conjunction reads no column, but the predicate still
            // needs a batch to learn the row count.
            let filter_columns = if self.filters.columns().is_empty() {
                self.projection.iter().copied().take(1).collect()
            } else {
                self.filters.columns().to_vec()
            };
            let exprs = self.filters.exprs().to_vec();
            let predicate = ArrowPredicateFn::new(
                ProjectionMask::roots(parquet_schema, filter_columns),
                move |batch| FilterEvaluator::evaluate_all(&exprs, &batch),
            );
            let predicates: Vec<Box<dyn ArrowPredicate>> = vec![Box::new(predicate)];
            builder = builder.with_row_filter(RowFilter::new(predicates));
        }

        Ok(builder.build()?)
    }
}
