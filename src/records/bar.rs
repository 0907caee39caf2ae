//! OHLCV bar record.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::{Float64Type, SchemaRef, UInt64Type};
use arrow::record_batch::RecordBatch;

use super::metadata::InstrumentContext;
use super::{primitive_column, ColumnSpec, ColumnarRecord};
use crate::error::{Result, TickscanError};
use crate::types::{format_unix_nanos, ColumnType, Price, Quantity, UnixNanos};

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("open", ColumnType::Float64),
    ColumnSpec::new("high", ColumnType::Float64),
    ColumnSpec::new("low", ColumnType::Float64),
    ColumnSpec::new("close", ColumnType::Float64),
    ColumnSpec::new("volume", ColumnType::Float64),
    ColumnSpec::new("ts_event", ColumnType::UInt64),
    ColumnSpec::new("ts_init", ColumnType::UInt64),
];

/// Aggregated open/high/low/close/volume over one bar interval.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bar {
    /// Instrument identifier from the file metadata.
    pub instrument_id: u32,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    /// Bar close time.
    pub ts_event: UnixNanos,
    /// When the record was created.
    pub ts_init: UnixNanos,
}

/// Float components of a bar before fixed-point conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarValues {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Creates a bar from float components, rounding to the context precisions.
    ///
    /// # Errors
    ///
    /// Returns `CorruptData` for non-finite prices, negative volume, or a
    /// high/low range that does not contain the open and close.
    pub fn from_f64(
        ctx: &InstrumentContext,
        values: BarValues,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Result<Self> {
        let bar = Self {
            instrument_id: ctx.instrument_id,
            open: Price::from_f64(values.open, ctx.price_precision)?,
            high: Price::from_f64(values.high, ctx.price_precision)?,
            low: Price::from_f64(values.low, ctx.price_precision)?,
            close: Price::from_f64(values.close, ctx.price_precision)?,
            volume: Quantity::from_f64(values.volume, ctx.size_precision)?,
            ts_event,
            ts_init,
        };
        bar.check_range()?;
        Ok(bar)
    }

    fn check_range(&self) -> Result<()> {
        let (high, low) = (self.high.raw, self.low.raw);
        if high < low || high < self.open.raw || high < self.close.raw {
            return Err(TickscanError::CorruptData(format!(
                "bar high {} is below low, open or close",
                self.high
            )));
        }
        if low > self.open.raw || low > self.close.raw {
            return Err(TickscanError::CorruptData(format!(
                "bar low {} is above open or close",
                self.low
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.instrument_id,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            format_unix_nanos(self.ts_event)
        )
    }
}

impl ColumnarRecord for Bar {
    const NAME: &'static str = "Bar";

    type Context = InstrumentContext;

    fn columns() -> &'static [ColumnSpec] {
        COLUMNS
    }

    fn decode_context(metadata: &HashMap<String, String>) -> Result<Self::Context> {
        InstrumentContext::from_metadata(metadata)
    }

    fn decode_batch(
        batch: &RecordBatch,
        ctx: &Self::Context,
        out: &mut Vec<Self>,
    ) -> Result<()> {
        let open = primitive_column::<Float64Type>(batch, "open")?;
        let high = primitive_column::<Float64Type>(batch, "high")?;
        let low = primitive_column::<Float64Type>(batch, "low")?;
        let close = primitive_column::<Float64Type>(batch, "close")?;
        let volume = primitive_column::<Float64Type>(batch, "volume")?;
        let ts_event = primitive_column::<UInt64Type>(batch, "ts_event")?;
        let ts_init = primitive_column::<UInt64Type>(batch, "ts_init")?;

        out.reserve(batch.num_rows());
        for row in 0..batch.num_rows() {
            let values = BarValues {
                open: open.value(row),
                high: high.value(row),
                low: low.value(row),
                close: close.value(row),
                volume: volume.value(row),
            };
            let bar = Bar::from_f64(ctx, values, ts_event.value(row), ts_init.value(row))
                .map_err(|e| match e {
                    TickscanError::CorruptData(msg) => {
                        TickscanError::CorruptData(format!("bar row {row}: {msg}"))
                    }
                    other => other,
                })?;
            out.push(bar);
        }
        Ok(())
    }

    fn file_metadata(records: &[Self]) -> Result<HashMap<String, String>> {
        let contexts = records.iter().flat_map(|b| {
            [b.open, b.high, b.low, b.close]
                .map(|p| InstrumentContext::new(b.instrument_id, p.precision, b.volume.precision))
        });
        Ok(InstrumentContext::shared(contexts)?
            .unwrap_or(InstrumentContext::new(0, 0, 0))
            .to_metadata())
    }

    fn encode_batch(records: &[Self], schema: SchemaRef) -> Result<RecordBatch> {
        let price_column = |f: fn(&Bar) -> Price| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|b| f(b).as_f64()),
            ))
        };
        let columns: Vec<ArrayRef> = vec![
            price_column(|b| b.open),
            price_column(|b| b.high),
            price_column(|b| b.low),
            price_column(|b| b.close),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|b| b.volume.as_f64()),
            )),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|b| b.ts_event))),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|b| b.ts_init))),
        ];
        RecordBatch::try_new(schema, columns).map_err(|e| TickscanError::EncodeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::record_schema;

    fn values(open: f64, high: f64, low: f64, close: f64) -> BarValues {
        BarValues {
            open,
            high,
            low,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn test_valid_bar() {
        let ctx = InstrumentContext::new(1, 2, 0);
        let bar = Bar::from_f64(&ctx, values(1.0, 1.5, 0.5, 1.25), 60, 61).unwrap();
        assert_eq!(bar.high.raw, 150);
        assert_eq!(bar.volume.raw, 10);
    }

    #[test]
    fn test_high_below_low_is_corrupt() {
        let ctx = InstrumentContext::new(1, 2, 0);
        let err = Bar::from_f64(&ctx, values(1.0, 0.5, 1.5, 1.0), 0, 0).unwrap_err();
        assert!(matches!(err, TickscanError::CorruptData(_)));
    }

    #[test]
    fn test_close_outside_range_is_corrupt() {
        let ctx = InstrumentContext::new(1, 2, 0);
        assert!(Bar::from_f64(&ctx, values(1.0, 1.5, 0.5, 2.0), 0, 0).is_err());
        assert!(Bar::from_f64(&ctx, values(0.25, 1.5, 0.5, 1.0), 0, 0).is_err());
    }

    #[test]
    fn test_encode_then_decode_preserves_bars() {
        let ctx = InstrumentContext::new(2, 2, 1);
        let bars: Vec<Bar> = (0..3u64)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar::from_f64(&ctx, values(base, base + 1.0, base - 1.0, base + 0.5), i, i)
                    .unwrap()
            })
            .collect();
        let schema = record_schema::<Bar>(Bar::file_metadata(&bars).unwrap());
        let batch = Bar::encode_batch(&bars, schema).unwrap();
        let mut decoded = Vec::new();
        Bar::decode_batch(&batch, &ctx, &mut decoded).unwrap();
        assert_eq!(decoded, bars);
    }
}
