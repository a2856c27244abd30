//! Purpose: Separate borrowed input bytes from library-owned output bytes.
//! Exports: `InputView`, `OwnedBuf`.
//! Role: The only place raw `(ptr, len)` pairs turn into slices or back.
//! Invariants: `InputView` never outlives the call that produced it and never frees.
//! Invariants: `OwnedBuf::into_raw` yields `(null, 0)` for empty payloads; nothing is allocated.
//! Invariants: Only pointers produced by `OwnedBuf::into_raw` may reach `OwnedBuf::from_raw`.
use crate::core::error::{Error, ErrorKind};
use std::ptr;

/// Read-only view over caller-owned bytes.
#[derive(Clone, Copy, Debug)]
pub struct InputView<'a> {
    bytes: &'a [u8],
}

impl<'a> InputView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn empty() -> Self {
        Self { bytes: &[] }
    }

    /// Build a view from a raw pointer pair supplied by a foreign caller.
    ///
    /// A null pointer is accepted only with a zero length.
    ///
    /// # Safety
    ///
    /// When `data` is non-null it must point at `len` initialized bytes that stay
    /// valid and unmodified for `'a`.
    pub unsafe fn from_raw(data: *const u8, len: usize) -> Result<Self, Error> {
        if data.is_null() {
            if len == 0 {
                return Ok(Self::empty());
            }
            return Err(Error::new(ErrorKind::Usage)
                .with_message("input data is null but len is non-zero"));
        }
        if len > isize::MAX as usize {
            return Err(Error::new(ErrorKind::Usage).with_message("input len exceeds isize::MAX"));
        }
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn as_str(&self) -> Result<&'a str, Error> {
        std::str::from_utf8(self.bytes).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("input is not valid UTF-8")
                .with_source(err)
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bytes allocated by this library and lent to a caller until released.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OwnedBuf {
    bytes: Box<[u8]>,
}

impl OwnedBuf {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hand the allocation to the caller as a raw pair.
    pub fn into_raw(self) -> (*const u8, usize) {
        if self.bytes.is_empty() {
            return (ptr::null(), 0);
        }
        let len = self.bytes.len();
        let data = Box::into_raw(self.bytes) as *mut u8;
        (data as *const u8, len)
    }

    /// Reclaim an allocation previously produced by [`OwnedBuf::into_raw`].
    ///
    /// Returns `None` for the canonical empty pair.
    ///
    /// # Safety
    ///
    /// A non-empty pair must come from `into_raw` and must not have been reclaimed before.
    pub unsafe fn from_raw(data: *const u8, len: usize) -> Option<Self> {
        if data.is_null() || len == 0 {
            return None;
        }
        let slice = ptr::slice_from_raw_parts_mut(data as *mut u8, len);
        let bytes = unsafe { Box::from_raw(slice) };
        Some(Self { bytes })
    }
}

impl From<Vec<u8>> for OwnedBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<String> for OwnedBuf {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::{InputView, OwnedBuf};
    use crate::core::error::ErrorKind;
    use std::ptr;

    #[test]
    fn null_with_zero_len_is_empty_input() {
        let view = unsafe { InputView::from_raw(ptr::null(), 0) }.expect("empty view");
        assert!(view.is_empty());
        assert_eq!(view.as_bytes(), b"");
    }

    #[test]
    fn null_with_len_is_rejected() {
        let err = unsafe { InputView::from_raw(ptr::null(), 4) }.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn view_reads_caller_bytes() {
        let data = b"embed-check".to_vec();
        let view = unsafe { InputView::from_raw(data.as_ptr(), data.len()) }.expect("view");
        assert_eq!(view.as_str().expect("utf8"), "embed-check");
        assert_eq!(view.len(), 11);
    }

    #[test]
    fn invalid_utf8_is_usage_error() {
        let data = [0xffu8, 0xfe];
        let err = InputView::new(&data).as_str().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn empty_owned_buf_is_not_allocated() {
        let (data, len) = OwnedBuf::new(Vec::new()).into_raw();
        assert!(data.is_null());
        assert_eq!(len, 0);
        assert!(unsafe { OwnedBuf::from_raw(data, len) }.is_none());
    }

    #[test]
    fn owned_buf_survives_raw_transfer() {
        let (data, len) = OwnedBuf::from("abc".to_string()).into_raw();
        assert!(!data.is_null());
        assert_eq!(len, 3);
        let back = unsafe { OwnedBuf::from_raw(data, len) }.expect("reclaimed");
        assert_eq!(back.as_bytes(), b"abc");
    }
}
