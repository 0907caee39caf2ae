//! Exact-capacity record buffers handed across the C ABI.
//!
//! [`ExportedVec`] owns decoded records in a boxed slice, so its capacity
//! always equals its length. [`ExportedVec::into_raw`] releases ownership as a
//! [`CVec`] descriptor; the buffer must come back through
//! [`ExportedVec::from_raw`] to be freed.

use std::ops::Deref;
use std::ptr;
use std::slice;

use crate::error::{Result, TickscanError};

/// `(ptr, len, cap)` descriptor of an exported buffer.
///
/// A failed export has a null `ptr`. A successful empty export has a
/// non-null dangling `ptr` with `len == cap == 0`.
#[repr(C)]
#[derive(Debug)]
pub struct CVec<T> {
    pub ptr: *mut T,
    pub len: usize,
    pub cap: usize,
}

impl<T> CVec<T> {
    /// Descriptor signalling a failed export.
    #[must_use]
    pub fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Returns true if the descriptor does not own a buffer.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len` or the descriptor is null.
    ///
    /// # Safety
    ///
    /// A non-null descriptor must come from [`ExportedVec::into_raw`] and not
    /// have been released. The reference must not outlive the buffer.
    #[allow(unsafe_code)]
    pub unsafe fn get(&self, index: usize) -> Result<&T> {
        if self.ptr.is_null() || index >= self.len {
            return Err(TickscanError::IndexOutOfRange {
                index,
                len: if self.ptr.is_null() { 0 } else { self.len },
            });
        }
        // SAFETY: index < len and the caller guarantees ptr addresses len
        // initialized elements.
        Ok(unsafe { &*self.ptr.add(index) })
    }
}

/// Records in an exact-size buffer with bounds-checked access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedVec<T> {
    buffer: Box<[T]>,
}

impl<T> ExportedVec<T> {
    /// Takes ownership of `records`, keeping their order.
    #[must_use]
    pub fn export(records: Vec<T>) -> Self {
        Self {
            buffer: records.into_boxed_slice(),
        }
    }

    /// Copies `records` into a new buffer.
    #[must_use]
    pub fn from_slice(records: &[T]) -> Self
    where
        T: Clone,
    {
        Self {
            buffer: records.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Always equal to [`len`](Self::len).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }

    /// Returns the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= len`.
    pub fn index(&self, index: usize) -> Result<&T> {
        self.buffer
            .get(index)
            .ok_or(TickscanError::IndexOutOfRange {
                index,
                len: self.buffer.len(),
            })
    }

    /// Returns the buffer as a `Vec` without copying.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.buffer.into_vec()
    }

    /// Releases ownership as a `(ptr, len, cap)` descriptor.
    #[must_use]
    pub fn into_raw(self) -> CVec<T> {
        let len = self.buffer.len();
        let ptr = Box::into_raw(self.buffer).cast::<T>();
        CVec { ptr, len, cap: len }
    }

    /// Reclaims a buffer released by [`into_raw`](Self::into_raw).
    ///
    /// Returns an empty vector for a null descriptor.
    ///
    /// # Safety
    ///
    /// A non-null descriptor must come from `into_raw` with its fields
    /// unchanged, and must not be reclaimed twice.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn from_raw(raw: CVec<T>) -> Self {
        if raw.ptr.is_null() {
            return Self::export(Vec::new());
        }
        debug_assert_eq!(raw.len, raw.cap);
        // SAFETY: ptr and len describe the boxed slice leaked by into_raw.
        let buffer = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(raw.ptr, raw.len)) };
        Self { buffer }
    }

    /// Borrows the records of a live descriptor.
    ///
    /// # Safety
    ///
    /// Same contract as [`CVec::get`].
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn view(raw: &CVec<T>) -> &[T] {
        if raw.ptr.is_null() {
            return &[];
        }
        // SAFETY: guaranteed by the caller.
        unsafe { slice::from_raw_parts(raw.ptr, raw.len) }
    }
}

impl<T> Deref for ExportedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.buffer
    }
}

impl<T> From<Vec<T>> for ExportedVec<T> {
    fn from(records: Vec<T>) -> Self {
        Self::export(records)
    }
}

impl<'a, T> IntoIterator for &'a ExportedVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffer.iter()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn test_export_keeps_order_and_exact_capacity() {
        let mut records = Vec::with_capacity(16);
        records.extend([3, 1, 2]);
        let exported = ExportedVec::export(records);
        assert_eq!(exported.len(), 3);
        assert_eq!(exported.capacity(), 3);
        assert_eq!(exported.as_slice(), &[3, 1, 2]);
    }

    #[test]
    fn test_index_bounds() {
        let exported = ExportedVec::from_slice(&[10, 20]);
        assert_eq!(*exported.index(1).unwrap(), 20);
        match exported.index(2) {
            Err(TickscanError::IndexOutOfRange { index, len }) => {
                assert_eq!((index, len), (2, 2));
            }
            other => panic!("Expected IndexOutOfRange, got {other:?}"),
        }
        // A negative host index arrives as a wrapped usize.
        assert!(exported.index((-1i64) as usize).is_err());
    }

    #[test]
    fn test_raw_round_trip() {
        let raw = ExportedVec::export(vec![1u64, 2, 3]).into_raw();
        assert!(!raw.is_null());
        assert_eq!((raw.len, raw.cap), (3, 3));
        unsafe {
            assert_eq!(*raw.get(2).unwrap(), 3);
            assert!(raw.get(3).is_err());
            assert_eq!(ExportedVec::view(&raw), &[1, 2, 3]);
            let back = ExportedVec::from_raw(raw);
            assert_eq!(back.into_vec(), vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_empty_export_is_not_null() {
        let raw = ExportedVec::<u64>::export(Vec::new()).into_raw();
        assert!(!raw.is_null());
        assert_eq!((raw.len, raw.cap), (0, 0));
        unsafe {
            assert!(raw.get(0).is_err());
            drop(ExportedVec::from_raw(raw));
        }
    }

    #[test]
    fn test_null_descriptor() {
        let raw = CVec::<u64>::null();
        unsafe {
            assert!(matches!(
                raw.get(0),
                Err(TickscanError::IndexOutOfRange { index: 0, len: 0 })
            ));
            assert!(ExportedVec::view(&raw).is_empty());
            assert!(ExportedVec::from_raw(raw).is_empty());
        }
    }
}
