//! Parquet writer for record types.
//!
//! Files written here carry the record's metadata keys, so they decode back
//! with [`crate::decode`].

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::arrow::ArrowWriter;
use parquet::basic::Compression as ParquetCompression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TickscanError};
use crate::records::{record_schema, ColumnarRecord};

/// Page compression codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    None,
    #[default]
    Snappy,
}

impl From<Compression> for ParquetCompression {
    fn from(c: Compression) -> Self {
        match c {
            Compression::None => ParquetCompression::UNCOMPRESSED,
            Compression::Snappy => ParquetCompression::SNAPPY,
        }
    }
}

/// Configuration for [`write_records`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Maximum rows per row group (default: 65536).
    pub max_row_group_size: usize,
    /// Page compression (default: Snappy).
    pub compression: Compression,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            max_row_group_size: 64 * 1024,
            compression: Compression::default(),
        }
    }
}

impl WriterConfig {
    /// Creates a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of rows per row group.
    #[must_use]
    pub fn with_max_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = rows;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

/// Writes `records` to a new Parquet file at `path`, replacing any existing file.
///
/// # Errors
///
/// Returns `InvalidArgument` for a zero row-group size or for records that
/// do not share one instrument context, `Io` if the file cannot be created,
/// and `EncodeError` if encoding fails.
pub fn write_records<R: ColumnarRecord>(
    path: impl AsRef<Path>,
    records: &[R],
    config: &WriterConfig,
) -> Result<()> {
    if config.max_row_group_size == 0 {
        return Err(TickscanError::InvalidArgument(
            "max_row_group_size must be greater than zero".into(),
        ));
    }
    let path = path.as_ref();
    let schema = record_schema::<R>(R::file_metadata(records)?);

    let mut key_values: Vec<KeyValue> = schema
        .metadata()
        .iter()
        .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
        .collect();
    key_values.sort_by(|a, b| a.key.cmp(&b.key));
    let props = WriterProperties::builder()
        .set_max_row_group_size(config.max_row_group_size)
        .set_compression(config.compression.into())
        .set_key_value_metadata((!key_values.is_empty()).then_some(key_values))
        .build();

    let file = File::create(path)
        .map_err(|e| TickscanError::Io(format!("{}: {e}", path.display())))?;
    let mut writer =
        ArrowWriter::try_new(file, Arc::clone(&schema), Some(props)).map_err(encode_error)?;
    for chunk in records.chunks(config.max_row_group_size) {
        let batch = R::encode_batch(chunk, Arc::clone(&schema))?;
        writer.write(&batch).map_err(encode_error)?;
    }
    writer.close().map_err(encode_error)?;

    log::debug!(
        "Wrote {} {} records to {}",
        records.len(),
        R::NAME,
        path.display()
    );
    Ok(())
}

fn encode_error(err: ParquetError) -> TickscanError {
    TickscanError::EncodeError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{InstrumentContext, QuoteTick};

    #[test]
    fn test_config_defaults() {
        let config = WriterConfig::default();
        assert_eq!(config.max_row_group_size, 65536);
        assert_eq!(config.compression, Compression::Snappy);
    }

    #[test]
    fn test_rejects_zero_row_group_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::new().with_max_row_group_size(0);
        let err = write_records::<QuoteTick>(dir.path().join("q.parquet"), &[], &config)
            .unwrap_err();
        assert!(matches!(err, TickscanError::InvalidArgument(_)));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.parquet");
        let ctx = InstrumentContext::new(7, 2, 0);
        let quotes: Vec<QuoteTick> = (0..5u64)
            .map(|i| {
                QuoteTick::from_f64(&ctx, 1.0 + i as f64, 1.5 + i as f64, 10.0, 20.0, i, i)
                    .unwrap()
            })
            .collect();
        let config = WriterConfig::new()
            .with_max_row_group_size(2)
            .with_compression(Compression::None);
        write_records(&path, &quotes, &config).unwrap();

        let back: Vec<QuoteTick> = crate::decode(&path, &[]).unwrap();
        assert_eq!(back, quotes);
    }

    #[test]
    fn test_rejects_mixed_instrument_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.parquet");
        let quotes = vec![
            QuoteTick::from_f64(&InstrumentContext::new(1, 2, 0), 1.25, 1.5, 1.0, 1.0, 0, 0)
                .unwrap(),
            QuoteTick::from_f64(&InstrumentContext::new(2, 4, 0), 1.2345, 1.5, 1.0, 1.0, 1, 1)
                .unwrap(),
        ];
        let err = write_records(&path, &quotes, &WriterConfig::default()).unwrap_err();
        assert!(matches!(err, TickscanError::InvalidArgument(_)));
        assert!(!path.exists());
    }
}
