//! Async entry point for callers on a tokio runtime.

use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TickscanError};
use crate::filter::FilterExpr;
use crate::records::ColumnarRecord;

use super::ColumnarReader;

/// Decodes on tokio's blocking pool, optionally bounded by `timeout`.
///
/// On timeout the blocking task keeps running in the background and its
/// output is dropped.
///
/// # Errors
///
/// Returns `QueryTimeout` when the decode exceeds `timeout`, `ThreadPanic` if
/// the decode task panicked, and otherwise the errors of
/// [`ColumnarReader::decode`].
pub async fn decode_async<R: ColumnarRecord>(
    reader: &ColumnarReader,
    path: impl AsRef<Path>,
    filters: &[FilterExpr],
    timeout: Option<Duration>,
) -> Result<Vec<R>> {
    let reader = reader.clone();
    let path = path.as_ref().to_path_buf();
    let filters = filters.to_vec();
    let handle = tokio::task::spawn_blocking(move || reader.decode::<R>(&path, &filters));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
            TickscanError::QueryTimeout {
                timeout_ms: limit.as_millis() as u64,
            }
        })?,
        None => handle.await,
    };
    joined.map_err(|e| TickscanError::ThreadPanic(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::QuoteTick;

    #[tokio::test]
    async fn test_missing_file_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_async::<QuoteTick>(
            &ColumnarReader::default(),
            dir.path().join("missing.parquet"),
            &[],
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TickscanError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_zero_timeout_reports_timeout_or_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = decode_async::<QuoteTick>(
            &ColumnarReader::default(),
            dir.path().join("missing.parquet"),
            &[],
            Some(Duration::ZERO),
        )
        .await;
        // A zero budget may still observe a task that already finished.
        assert!(matches!(
            result,
            Err(TickscanError::QueryTimeout { timeout_ms: 0 } | TickscanError::NotFound { .. })
        ));
    }
}
