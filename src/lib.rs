//! tickscan - columnar market-data decoding with a C ABI.
//!
//! Reads Parquet files into vectors of fixed-layout records, with predicate
//! filters pushed down into the scan, and exports the vectors across a C
//! boundary as `(ptr, len, cap)` descriptors with bounds-checked indexing.
//!
//! ```no_run
//! use tickscan::{decode, parse_filters, ExportedVec, QuoteTick};
//!
//! let filters = parse_filters("bid_price > 1.5 AND ts_event BETWEEN 0 AND 1000")?;
//! let quotes: Vec<QuoteTick> = decode("quotes.parquet", &filters)?;
//! let exported = ExportedVec::export(quotes);
//! let first = exported.index(0)?;
//! # let _ = first;
//! # Ok::<(), tickscan::TickscanError>(())
//! ```

pub mod error;
pub mod export;
pub mod ffi;
pub mod filter;
pub mod reader;
pub mod records;
pub mod types;
pub mod writer;

pub use error::{ErrorCode, Result, TickscanError};
pub use export::{CVec, ExportedVec};
pub use filter::{parse_filters, FilterExpr};
pub use reader::{decode, decode_async, ColumnarReader, FileSummary, ReaderConfig};
pub use records::{Bar, BarValues, ColumnarRecord, InstrumentContext, QuoteTick};
pub use types::{Price, Quantity, ScalarValue, UnixNanos};
pub use writer::{write_records, Compression, WriterConfig};
