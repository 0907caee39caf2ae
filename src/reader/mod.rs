//! Columnar decoder: reads Parquet files into fixed-layout records.
//!
//! A decode runs in four steps:
//!
//! 1. Load the footer and validate the file schema against the record type.
//! 2. Bind filters to the schema (`SchemaMismatch` surfaces here, before any
//!    data page is read).
//! 3. Prune row groups whose statistics prove no row can match.
//! 4. Scan the remaining row groups with the filter pushed down as a row
//!    filter and the record columns as projection, decoding batches into
//!    records in on-disk order.
//!
//! Any error discards all partial output.

mod runtime;
mod scan;

pub use runtime::decode_async;

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TickscanError};
use crate::filter::pruning::prune_row_groups;
use crate::filter::{bind_filters, FilterExpr};
use crate::records::{validate_columns, ColumnarRecord};
use scan::ScanPlan;

/// Configuration for [`ColumnarReader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Rows per decoded Arrow batch (default: 8192).
    pub batch_size: usize,
    /// Decode row groups in parallel (default: true).
    pub parallel: bool,
    /// Worker threads for parallel decoding. None = rayon's global pool.
    pub num_threads: Option<usize>,
    /// Skip row groups using column statistics (default: true).
    pub prune_row_groups: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            parallel: true,
            num_threads: None,
            prune_row_groups: true,
        }
    }
}

impl ReaderConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decoded batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables or disables parallel row-group decoding.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Enables or disables statistics-based row-group pruning.
    #[must_use]
    pub fn with_prune_row_groups(mut self, prune: bool) -> Self {
        self.prune_row_groups = prune;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero batch size or thread count.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TickscanError::InvalidArgument(
                "batch_size must be greater than zero".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(TickscanError::InvalidArgument(
                "num_threads must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Decodes columnar files into records.
///
/// Cloning is cheap; clones share the worker pool.
#[derive(Debug, Clone, Default)]
pub struct ColumnarReader {
    config: ReaderConfig,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ColumnarReader {
    /// Creates a reader, building a dedicated pool when `num_threads` is set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an invalid config, or `Io` if the worker
    /// pool cannot be started.
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.num_threads {
            Some(n) if config.parallel => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("tickscan-decode-{i}"))
                    .build()
                    .map_err(|e| TickscanError::Io(format!("failed to start decode pool: {e}")))?,
            )),
            _ => None,
        };
        Ok(Self { config, pool })
    }

    /// Returns the reader configuration.
    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Decodes the rows of `path` that satisfy every filter, in on-disk order.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` does not exist.
    /// - `SchemaMismatch` if the file lacks a column or metadata key of `R`,
    ///   or a filter does not fit the file schema.
    /// - `CorruptData` if the file cannot be parsed or a value violates the
    ///   record's invariants.
    pub fn decode<R: ColumnarRecord>(
        &self,
        path: impl AsRef<Path>,
        filters: &[FilterExpr],
    ) -> Result<Vec<R>> {
        let path = path.as_ref();
        let file = open_file(path)?;
        let metadata = load_metadata(&file)?;
        let schema = Arc::clone(metadata.schema());

        let projection = validate_columns::<R>(&schema)?;
        let filters = bind_filters(filters, &schema)?;
        let ctx = R::decode_context(schema.metadata())?;

        let total_groups = metadata.metadata().num_row_groups();
        let row_groups = if self.config.prune_row_groups {
            prune_row_groups(metadata.metadata(), &schema, filters.exprs())
        } else {
            (0..total_groups).collect()
        };
        log::debug!(
            "{}: scanning {} of {} row groups ({} filters)",
            path.display(),
            row_groups.len(),
            total_groups,
            filters.exprs().len()
        );

        let plan = ScanPlan {
            metadata,
            projection,
            filters,
            row_groups,
            batch_size: self.config.batch_size,
        };
        let records = if self.config.parallel && plan.row_groups.len() > 1 {
            match &self.pool {
                Some(pool) => pool.install(|| plan.scan_parallel::<R>(path, &ctx)),
                None => plan.scan_parallel::<R>(path, &ctx),
            }
        } else {
            plan.scan_sequential::<R>(file, &ctx)
        }?;

        log::info!(
            "Decoded {} {} records from {}",
            records.len(),
            R::NAME,
            path.display()
        );
        Ok(records)
    }

    /// Reads the footer of `path` without decoding any rows.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Io` or `CorruptData` as for [`decode`](Self::decode).
    pub fn inspect(&self, path: impl AsRef<Path>) -> Result<FileSummary> {
        let path = path.as_ref();
        let file = open_file(path)?;
        let metadata = load_metadata(&file)?;
        let parquet = metadata.metadata();
        Ok(FileSummary {
            path: path.display().to_string(),
            schema: Arc::clone(metadata.schema()),
            num_rows: parquet.file_metadata().num_rows(),
            created_by: parquet.file_metadata().created_by().map(str::to_string),
            row_groups: parquet
                .row_groups()
                .iter()
                .map(|rg| RowGroupSummary {
                    num_rows: rg.num_rows(),
                    compressed_size: rg.compressed_size(),
                })
                .collect(),
        })
    }
}

/// Decodes `path` with the default reader configuration.
///
/// # Errors
///
/// See [`ColumnarReader::decode`].
pub fn decode<R: ColumnarRecord>(path: impl AsRef<Path>, filters: &[FilterExpr]) -> Result<Vec<R>> {
    ColumnarReader::default().decode(path, filters)
}

/// Footer-level description of a columnar file.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub path: String,
    pub schema: SchemaRef,
    pub num_rows: i64,
    pub created_by: Option<String>,
    pub row_groups: Vec<RowGroupSummary>,
}

/// Size of one row group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGroupSummary {
    pub num_rows: i64,
    pub compressed_size: i64,
}

impl FileSummary {
    /// Returns the file's key/value metadata.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        self.schema.metadata()
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "file: {}", self.path)?;
        if let Some(created_by) = &self.created_by {
            writeln!(f, "created by: {created_by}")?;
        }
        writeln!(f, "rows: {}", self.num_rows)?;
        writeln!(f, "columns:")?;
        for field in self.schema.fields() {
            writeln!(f, "  {}: {}", field.name(), field.data_type())?;
        }
        let mut keys: Vec<_> = self.metadata().iter().collect();
        keys.sort();
        if !keys.is_empty() {
            writeln!(f, "metadata:")?;
            for (k, v) in keys {
                writeln!(f, "  {k} = {v}")?;
            }
        }
        write!(f, "row groups: {}", self.row_groups.len())?;
        for (i, rg) in self.row_groups.iter().enumerate() {
            write!(
                f,
                "\n  [{i}] {} rows, {} bytes",
                rg.num_rows, rg.compressed_size
            )?;
        }
        Ok(())
    }
}

pub(crate) fn open_file(path: &Path) -> Result<File> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TickscanError::NotFound {
            path: path.display().to_string(),
        },
        _ => TickscanError::Io(format!("{}: {e}", path.display())),
    })?;
    if file.metadata()?.is_dir() {
        return Err(TickscanError::Io(format!(
            "{} is a directory",
            path.display()
        )));
    }
    Ok(file)
}

fn load_metadata(file: &File) -> Result<ArrowReaderMetadata> {
    Ok(ArrowReaderMetadata::load(file, ArrowReaderOptions::new())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.batch_size, 8192);
        assert!(config.parallel);
        assert_eq!(config.num_threads, None);
        assert!(config.prune_row_groups);
    }

    #[test]
    fn test_config_builder() {
        let config = ReaderConfig::new()
            .with_batch_size(16)
            .with_parallel(false)
            .with_num_threads(2)
            .with_prune_row_groups(false);
        assert_eq!(config.batch_size, 16);
        assert!(!config.parallel);
        assert_eq!(config.num_threads, Some(2));
        assert!(!config.prune_row_groups);
    }

    #[test]
    fn test_config_rejects_zero_sizes() {
        assert!(ColumnarReader::new(ReaderConfig::new().with_batch_size(0)).is_err());
        assert!(ColumnarReader::new(ReaderConfig::new().with_num_threads(0)).is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_file(&dir.path().join("missing.parquet")).unwrap_err();
        assert!(matches!(err, TickscanError::NotFound { .. }));
    }

    #[test]
    fn test_open_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_file(dir.path()).unwrap_err();
        assert!(matches!(err, TickscanError::Io(_)));
    }
}
