//! Per-thread record of the most recent ABI failure.

use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::ptr;

use crate::error::{ErrorCode, TickscanError};

thread_local! {
    static LAST_ERROR: RefCell<Option<(ErrorCode, CString)>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(err: &TickscanError) {
    let message = CString::new(err.to_string().replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some((err.code(), message)));
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Returns the code of the last failure on this thread, or 0 after a success.
#[no_mangle]
pub extern "C" fn tickscan_last_error_code() -> i32 {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ErrorCode::Ok as i32, |(code, _)| *code as i32)
    })
}

/// Returns the message of the last failure on this thread, or NULL.
///
/// The string stays valid until the next ABI call on the same thread.
#[no_mangle]
pub extern "C" fn tickscan_last_error_message() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |(_, message)| message.as_ptr())
    })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_set_and_clear() {
        set_last_error(&TickscanError::IndexOutOfRange { index: 5, len: 2 });
        assert_eq!(tickscan_last_error_code(), ErrorCode::IndexOutOfRange as i32);
        let message = unsafe { CStr::from_ptr(tickscan_last_error_message()) };
        assert_eq!(
            message.to_str().unwrap(),
            "Index out of range: index 5, length 2"
        );

        clear_last_error();
        assert_eq!(tickscan_last_error_code(), 0);
        assert!(tickscan_last_error_message().is_null());
    }

    #[test]
    fn test_interior_nul_is_replaced() {
        set_last_error(&TickscanError::InvalidArgument("a\0b".into()));
        let message = unsafe { CStr::from_ptr(tickscan_last_error_message()) };
        assert_eq!(message.to_str().unwrap(), "Invalid argument: a b");
    }

    #[test]
    fn test_errors_are_per_thread() {
        set_last_error(&TickscanError::CorruptData("x".into()));
        let other = std::thread::spawn(|| tickscan_last_error_code()).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(tickscan_last_error_code(), ErrorCode::CorruptData as i32);
    }
}
