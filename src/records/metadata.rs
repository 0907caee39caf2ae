//! File metadata keys shared by the market-data records.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Result, TickscanError};
use crate::types::FIXED_PRECISION_MAX;

/// Metadata key holding the numeric instrument identifier.
pub const INSTRUMENT_ID_KEY: &str = "instrument_id";
/// Metadata key holding the decimal precision of price columns.
pub const PRICE_PRECISION_KEY: &str = "price_precision";
/// Metadata key holding the decimal precision of size/volume columns.
pub const SIZE_PRECISION_KEY: &str = "size_precision";

/// Per-file values every quote and bar in a file shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentContext {
    /// Instrument the file belongs to.
    pub instrument_id: u32,
    /// Decimal places of prices.
    pub price_precision: u8,
    /// Decimal places of sizes and volumes.
    pub size_precision: u8,
}

impl InstrumentContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(instrument_id: u32, price_precision: u8, size_precision: u8) -> Self {
        Self {
            instrument_id,
            price_precision,
            size_precision,
        }
    }

    /// Parses the context from file metadata.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` when a key is missing, unparsable, or a
    /// precision exceeds the supported maximum.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self> {
        let ctx = Self {
            instrument_id: parse_key(metadata, INSTRUMENT_ID_KEY)?,
            price_precision: parse_key(metadata, PRICE_PRECISION_KEY)?,
            size_precision: parse_key(metadata, SIZE_PRECISION_KEY)?,
        };
        for (key, precision) in [
            (PRICE_PRECISION_KEY, ctx.price_precision),
            (SIZE_PRECISION_KEY, ctx.size_precision),
        ] {
            if precision > FIXED_PRECISION_MAX {
                return Err(TickscanError::SchemaMismatch(format!(
                    "metadata '{key}' = {precision} exceeds maximum {FIXED_PRECISION_MAX}"
                )));
            }
        }
        Ok(ctx)
    }

    /// Returns the one context every item of `contexts` agrees on, or `None`
    /// when there are none.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when two contexts differ, since a file
    /// stores a single context for all of its rows.
    pub fn shared(contexts: impl IntoIterator<Item = Self>) -> Result<Option<Self>> {
        let mut shared: Option<Self> = None;
        for ctx in contexts {
            match shared {
                None => shared = Some(ctx),
                Some(first) if first != ctx => {
                    return Err(TickscanError::InvalidArgument(format!(
                        "records mix instrument contexts: {first:?} and {ctx:?}"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(shared)
    }

    /// Renders the context as file metadata.
    #[must_use]
    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (INSTRUMENT_ID_KEY.to_string(), self.instrument_id.to_string()),
            (
                PRICE_PRECISION_KEY.to_string(),
                self.price_precision.to_string(),
            ),
            (
                SIZE_PRECISION_KEY.to_string(),
                self.size_precision.to_string(),
            ),
        ])
    }
}

fn parse_key<T: FromStr>(metadata: &HashMap<String, String>, key: &str) -> Result<T> {
    let raw = metadata.get(key).ok_or_else(|| {
        TickscanError::SchemaMismatch(format!("file metadata is missing '{key}'"))
    })?;
    raw.trim().parse().map_err(|_| {
        TickscanError::SchemaMismatch(format!("file metadata '{key}' has invalid value '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_roundtrip() {
        let ctx = InstrumentContext::new(42, 5, 0);
        let parsed = InstrumentContext::from_metadata(&ctx.to_metadata()).unwrap();
        assert_eq!(parsed, ctx);
    }

    #[test]
    fn test_missing_key() {
        let mut metadata = InstrumentContext::new(1, 2, 0).to_metadata();
        metadata.remove(PRICE_PRECISION_KEY);
        let err = InstrumentContext::from_metadata(&metadata).unwrap_err();
        assert!(err.to_string().contains(PRICE_PRECISION_KEY));
    }

    #[test]
    fn test_malformed_value() {
        let mut metadata = InstrumentContext::new(1, 2, 0).to_metadata();
        metadata.insert(INSTRUMENT_ID_KEY.to_string(), "EUR/USD".to_string());
        assert!(matches!(
            InstrumentContext::from_metadata(&metadata),
            Err(TickscanError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_precision_limit() {
        let metadata = InstrumentContext::new(1, 12, 0).to_metadata();
        assert!(InstrumentContext::from_metadata(&metadata).is_err());
    }
}
