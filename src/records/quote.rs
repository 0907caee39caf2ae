//! Top-of-book quote record.

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
    ColumnSpec::new("bid_price", ColumnType::Float64),
    ColumnSpec::new("ask_price", ColumnType::Float64),
    ColumnSpec::new("bid_size", ColumnType::Float64),
    ColumnSpec::new("ask_size", ColumnType::Float64),
    ColumnSpec::new("ts_event", ColumnType::UInt64),
    ColumnSpec::new("ts_init", ColumnType::UInt64),
];

/// Best bid and offer for an instrument at a point in time.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuoteTick {
    /// Instrument identifier from the file metadata.
    pub instrument_id: u32,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Quantity,
    pub ask_size: Quantity,
    /// When the quote occurred.
    pub ts_event: UnixNanos,
    /// When the record was created.
    pub ts_init: UnixNanos,
}

impl QuoteTick {
    /// Creates a quote from float components, rounding to the context precisions.
    ///
    /// # Errors
    ///
    /// Returns `CorruptData` for non-finite prices or negative sizes.
    pub fn from_f64(
        ctx: &InstrumentContext,
        bid_price: f64,
        ask_price: f64,
        bid_size: f64,
        ask_size: f64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Result<Self> {
        Ok(Self {
            instrument_id: ctx.instrument_id,
            bid_price: Price::from_f64(bid_price, ctx.price_precision)?,
            ask_price: Price::from_f64(ask_price, ctx.price_precision)?,
            bid_size: Quantity::from_f64(bid_size, ctx.size_precision)?,
            ask_size: Quantity::from_f64(ask_size, ctx.size_precision)?,
            ts_event,
            ts_init,
        })
    }
}

impl fmt::Display for QuoteTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.instrument_id,
            self.bid_price,
            self.ask_price,
            self.bid_size,
            self.ask_size,
            format_unix_nanos(self.ts_event)
        )
    }
}

impl ColumnarRecord for QuoteTick {
    const NAME: &'static str = "QuoteTick";

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
        let bid_price = primitive_column::<Float64Type>(batch, "bid_price")?;
        let ask_price = primitive_column::<Float64Type>(batch, "ask_price")?;
        let bid_size = primitive_column::<Float64Type>(batch, "bid_size")?;
        let ask_size = primitive_column::<Float64Type>(batch, "ask_size")?;
        let ts_event = primitive_column::<UInt64Type>(batch, "ts_event")?;
        let ts_init = primitive_column::<UInt64Type>(batch, "ts_init")?;

        out.reserve(batch.num_rows());
        for row in 0..batch.num_rows() {
            let quote = QuoteTick::from_f64(
                ctx,
                bid_price.value(row),
                ask_price.value(row),
                bid_size.value(row),
                ask_size.value(row),
                ts_event.value(row),
                ts_init.value(row),
            )
            .map_err(|e| match e {
                TickscanError::CorruptData(msg) => {
                    TickscanError::CorruptData(format!("quote row {row}: {msg}"))
                }
                other => other,
            })?;
            out.push(quote);
        }
        Ok(())
    }

    fn file_metadata(records: &[Self]) -> Result<HashMap<String, String>> {
        let contexts = records.iter().flat_map(|q| {
            [
                InstrumentContext::new(q.instrument_id, q.bid_price.precision, q.bid_size.precision),
                InstrumentContext::new(q.instrument_id, q.ask_price.precision, q.ask_size.precision),
            ]
        });
        Ok(InstrumentContext::shared(contexts)?
            .unwrap_or(InstrumentContext::new(0, 0, 0))
            .to_metadata())
    }

    fn encode_batch(records: &[Self], schema: SchemaRef) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|q| q.bid_price.as_f64()),
            )),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|q| q.ask_price.as_f64()),
            )),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|q| q.bid_size.as_f64()),
            )),
            Arc::new(Float64Array::from_iter_values(
                records.iter().map(|q| q.ask_size.as_f64()),
            )),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|q| q.ts_event))),
            Arc::new(UInt64Array::from_iter_values(records.iter().map(|q| q.ts_init))),
        ];
        RecordBatch::try_new(schema, columns).map_err(|e| TickscanError::EncodeError(e.to_string()))
    }
}
