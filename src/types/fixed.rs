//! Fixed-point price and quantity values carried inside records.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, TickscanError};

/// Maximum decimal precision for prices and quantities.
pub const FIXED_PRECISION_MAX: u8 = 9;

/// Nanoseconds since the UNIX epoch.
pub type UnixNanos = u64;

const POW10: [f64; 10] = [1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9];

/// Scales a float to a fixed-point integer, rounding half away from zero.
fn scale(value: f64, precision: u8, what: &str) -> Result<f64> {
    if precision > FIXED_PRECISION_MAX {
        return Err(TickscanError::SchemaMismatch(format!(
            "{what} precision {precision} exceeds maximum {FIXED_PRECISION_MAX}"
        )));
    }
    if !value.is_finite() {
        return Err(TickscanError::CorruptData(format!(
            "{what} value {value} is not finite"
        )));
    }
    Ok((value * POW10[precision as usize]).round())
}

/// Fixed-point price: `raw / 10^precision`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Price {
    /// Scaled integer value.
    pub raw: i64,
    /// Number of decimal places.
    pub precision: u8,
}

impl Price {
    /// Creates a price from its raw scaled value.
    #[must_use]
    pub const fn new(raw: i64, precision: u8) -> Self {
        Self { raw, precision }
    }

    /// Converts a float into a price with the given precision.
    ///
    /// # Errors
    ///
    /// Returns `CorruptData` for non-finite or out-of-range values, and
    /// `SchemaMismatch` when the precision exceeds [`FIXED_PRECISION_MAX`].
    pub fn from_f64(value: f64, precision: u8) -> Result<Self> {
        let scaled = scale(value, precision, "price")?;
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(TickscanError::CorruptData(format!(
                "price {value} overflows at precision {precision}"
            )));
        }
        Ok(Self::new(scaled as i64, precision))
    }

    /// Returns the price as a float.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / POW10[self.precision.min(FIXED_PRECISION_MAX) as usize]
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.precision as usize, self.as_f64())
    }
}

/// Fixed-point non-negative quantity: `raw / 10^precision`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantity {
    /// Scaled integer value.
    pub raw: u64,
    /// Number of decimal places.
    pub precision: u8,
}

impl Quantity {
    /// Creates a quantity from its raw scaled value.
    #[must_use]
    pub const fn new(raw: u64, precision: u8) -> Self {
        Self { raw, precision }
    }

    /// Converts a float into a quantity with the given precision.
    ///
    /// # Errors
    ///
    /// Returns `CorruptData` for negative, non-finite or out-of-range values,
    /// and `SchemaMismatch` when the precision exceeds [`FIXED_PRECISION_MAX`].
    pub fn from_f64(value: f64, precision: u8) -> Result<Self> {
        let scaled = scale(value, precision, "quantity")?;
        if scaled < 0.0 {
            return Err(TickscanError::CorruptData(format!(
                "quantity {value} is negative"
            )));
        }
        if scaled >= u64::MAX as f64 {
            return Err(TickscanError::CorruptData(format!(
                "quantity {value} overflows at precision {precision}"
            )));
        }
        Ok(Self::new(scaled as u64, precision))
    }

    /// Returns the quantity as a float.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / POW10[self.precision.min(FIXED_PRECISION_MAX) as usize]
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", self.precision as usize, self.as_f64())
    }
}

/// Formats a nanosecond timestamp as RFC 3339 UTC.
#[must_use]
pub fn format_unix_nanos(nanos: UnixNanos) -> String {
    match i64::try_from(nanos) {
        Ok(n) => DateTime::<Utc>::from_timestamp_nanos(n).to_rfc3339_opts(SecondsFormat::Nanos, true),
        Err(_) => nanos.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_rounds_to_precision() {
        let p = Price::from_f64(1.234_56, 4).unwrap();
        assert_eq!(p.raw, 12_346);
        assert_eq!(p.precision, 4);
        assert_eq!(p.to_string(), "1.2346");
    }

    #[test]
    fn test_negative_price_allowed() {
        let p = Price::from_f64(-0.5, 1).unwrap();
        assert_eq!(p.raw, -5);
    }

    #[test]
    fn test_price_rejects_nan() {
        let err = Price::from_f64(f64::NAN, 2).unwrap_err();
        assert!(matches!(err, TickscanError::CorruptData(_)));
    }

    #[test]
    fn test_price_rejects_excess_precision() {
        let err = Price::from_f64(1.0, 10).unwrap_err();
        assert!(matches!(err, TickscanError::SchemaMismatch(_)));
    }

    #[test]
    fn test_price_overflow() {
        assert!(Price::from_f64(1e18, 9).is_err());
    }

    #[test]
    fn test_quantity_rejects_negative() {
        let err = Quantity::from_f64(-1.0, 0).unwrap_err();
        assert!(matches!(err, TickscanError::CorruptData(_)));
    }

    #[test]
    fn test_quantity_display() {
        let q = Quantity::from_f64(100_000.0, 0).unwrap();
        assert_eq!(q.raw, 100_000);
        assert_eq!(q.to_string(), "100000");
        assert_eq!(q.as_f64(), 100_000.0);
    }

    #[test]
    fn test_format_unix_nanos() {
        assert_eq!(format_unix_nanos(0), "1970-01-01T00:00:00.000000000Z");
        assert_eq!(
            format_unix_nanos(1_000_000_001),
            "1970-01-01T00:00:01.000000001Z"
        );
    }
}
