//! C ABI over the decoder and exporter.
//!
//! Every record type gets a read, an index and a drop function. Failures are
//! reported through a null pointer plus the thread's last error
//! ([`tickscan_last_error_code`], [`tickscan_last_error_message`]). Panics are
//! caught at the boundary and reported as internal errors.

#![allow(unsafe_code)]

mod last_error;

pub use last_error::{tickscan_last_error_code, tickscan_last_error_message};

use std::any::Any;
use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::error::{Result, TickscanError};
use crate::export::{CVec, ExportedVec};
use crate::filter::parse_filters;
use crate::reader::decode;
use crate::records::{Bar, ColumnarRecord, QuoteTick};
use last_error::{clear_last_error, set_last_error};

/// Runs `f`, converting a panic into `ThreadPanic` and recording the outcome.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Option<T> {
    let outcome = catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(TickscanError::ThreadPanic(panic_message(&*payload))));
    match outcome {
        Ok(value) => {
            clear_last_error();
            Some(value)
        }
        Err(err) => {
            log::warn!("tickscan ABI call failed: {err}");
            set_last_error(&err);
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn c_str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(TickscanError::InvalidArgument(format!("{name} is null")));
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| TickscanError::InvalidArgument(format!("{name} is not valid UTF-8: {e}")))
}

/// # Safety
///
/// See the generated `read_*` functions.
unsafe fn read_records<R: ColumnarRecord>(
    path: *const c_char,
    filter_exprs: *const c_char,
) -> CVec<R> {
    guarded(|| {
        // SAFETY: forwarded from the caller.
        let path = unsafe { c_str_arg(path, "path") }?;
        let filters = if filter_exprs.is_null() {
            Vec::new()
        } else {
            // SAFETY: forwarded from the caller.
            parse_filters(unsafe { c_str_arg(filter_exprs, "filter_exprs") }?)?
        };
        decode::<R>(path, &filters)
    })
    .map_or_else(CVec::null, |records| ExportedVec::export(records).into_raw())
}

/// # Safety
///
/// See the generated `index_*` functions.
unsafe fn index_records<R>(vec: *const CVec<R>, index: usize) -> *const R {
    guarded(|| {
        if vec.is_null() {
            return Err(TickscanError::InvalidArgument("vector is null".into()));
        }
        // SAFETY: the caller passes a live descriptor from a read function.
        unsafe { (*vec).get(index) }.map(|r| r as *const R)
    })
    .unwrap_or(ptr::null())
}

/// # Safety
///
/// See the generated `drop_*` functions.
unsafe fn drop_records<R>(vec: *mut CVec<R>) {
    if vec.is_null() {
        return;
    }
    // SAFETY: the caller passes a descriptor from a read function; nulling it
    // makes a second drop a no-op.
    let raw = unsafe { ptr::replace(vec, CVec::null()) };
    drop(unsafe { ExportedVec::from_raw(raw) });
}

macro_rules! record_abi {
    ($record:ty, $read:ident, $index:ident, $drop:ident) => {
        #[doc = concat!("Decodes `", stringify!($record), "` records from the Parquet file at `path`.")]
        ///
        /// `filter_exprs` is filter text (for example `ts_event >= 10 AND
        /// bid_price > 1.5`) or NULL for no filter. On failure the returned
        /// descriptor has a null `ptr` and the last error is set.
        ///
        /// # Safety
        ///
        /// `path` must point to a NUL-terminated string. `filter_exprs` must be
        /// null or point to a NUL-terminated string. A successful result must
        /// be released with the matching drop function.
        #[no_mangle]
        pub unsafe extern "C" fn $read(
            path: *const c_char,
            filter_exprs: *const c_char,
        ) -> CVec<$record> {
            unsafe { read_records::<$record>(path, filter_exprs) }
        }

        #[doc = concat!("Returns a pointer to the `", stringify!($record), "` at index `i`.")]
        ///
        /// Returns NULL and sets `IndexOutOfRange` when `i >= len`. A negative
        /// host integer arrives as a huge `uintptr_t` and fails the same way.
        ///
        /// # Safety
        ///
        /// `vec` must be null or point to a live descriptor returned by the
        /// matching read function. The result is valid until the vector is
        /// dropped.
        #[no_mangle]
        pub unsafe extern "C" fn $index(vec: *const CVec<$record>, i: usize) -> *const $record {
            unsafe { index_records(vec, i) }
        }

        #[doc = concat!("Releases a `", stringify!($record), "` vector and nulls its descriptor.")]
        ///
        /// # Safety
        ///
        /// `vec` must be null or point to a descriptor returned by the
        /// matching read function.
        #[no_mangle]
        pub unsafe extern "C" fn $drop(vec: *mut CVec<$record>) {
            unsafe { drop_records(vec) }
        }
    };
}

record_abi!(
    QuoteTick,
    read_parquet_ticks,
    index_quote_tick_vector,
    drop_quote_tick_vector
);
record_abi!(Bar, read_parquet_bars, index_bar_vector, drop_bar_vector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::ffi::CString;

    #[test]
    fn test_null_path_is_invalid_argument() {
        let vec = unsafe { read_parquet_ticks(ptr::null(), ptr::null()) };
        assert!(vec.is_null());
        assert_eq!(tickscan_last_error_code(), ErrorCode::InvalidArgument as i32);
    }

    #[test]
    fn test_missing_file_sets_not_found() {
        let path = CString::new("/nonexistent/ticks.parquet").unwrap();
        let vec = unsafe { read_parquet_bars(path.as_ptr(), ptr::null()) };
        assert!(vec.is_null());
        assert_eq!(tickscan_last_error_code(), ErrorCode::NotFound as i32);
    }

    #[test]
    fn test_bad_filter_text_sets_parse_error() {
        let path = CString::new("/nonexistent/ticks.parquet").unwrap();
        let filters = CString::new("bid_price >").unwrap();
        let vec = unsafe { read_parquet_ticks(path.as_ptr(), filters.as_ptr()) };
        assert!(vec.is_null());
        assert_eq!(tickscan_last_error_code(), ErrorCode::Parse as i32);
    }

    #[test]
    fn test_index_null_vector() {
        let rec = unsafe { index_bar_vector(ptr::null(), 0) };
        assert!(rec.is_null());
        assert_eq!(tickscan_last_error_code(), ErrorCode::InvalidArgument as i32);
    }

    #[test]
    fn test_drop_nulls_descriptor() {
        let mut vec = ExportedVec::export(Vec::<QuoteTick>::new()).into_raw();
        unsafe {
            drop_quote_tick_vector(&mut vec);
            assert!(vec.is_null());
            drop_quote_tick_vector(&mut vec);
            drop_quote_tick_vector(ptr::null_mut());
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let out: Option<()> = guarded(|| panic!("boom"));
        assert!(out.is_none());
        assert_eq!(tickscan_last_error_code(), ErrorCode::Internal as i32);
    }
}
