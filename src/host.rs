//! Purpose: Safe Rust host over the C ABI, used by the CLI and integration tests.
//! Exports: `LibraryBuffer`, `info`, `scan`, `hash`, `normalize`, `chunk_plan`, `exec_ir`.
//! Role: Reference caller; goes through the exported `extern "C"` symbols, never the backends.
//! Invariants: A `LibraryBuffer` only wraps output written by an ABI call, so release never
//! Invariants: sees caller-owned memory; it is released exactly once, on drop.
//! Invariants: Non-OK statuses become `Error`s whose kind mirrors the status.
use crate::abi::{
    n3_buf, n3_chunk_options, n3_chunk_plan, n3_exec_ir, n3_free, n3_hash, n3_info,
    n3_normalize, n3_scan, n3_status,
};
use crate::core::error::{Error, ErrorKind};

/// Library-owned output; released when dropped.
#[derive(Debug)]
pub struct LibraryBuffer {
    raw: n3_buf,
}

impl LibraryBuffer {
    fn from_call<F>(op: &str, call: F) -> Result<Self, Error>
    where
        F: FnOnce(*mut n3_buf) -> n3_status,
    {
        let mut buffer = Self {
            raw: n3_buf::empty(),
        };
        let status = call(&raw mut buffer.raw);
        match status.error_kind() {
            None => Ok(buffer),
            Some(kind) => {
                debug_assert!(buffer.raw.is_empty());
                Err(status_error(op, status, kind))
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.raw.data.is_null() || self.raw.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.raw.data, self.raw.len) }
    }

    pub fn len(&self) -> usize {
        self.raw.len
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Copy the payload out and release the library allocation.
    pub fn into_vec(self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Drop for LibraryBuffer {
    fn drop(&mut self) {
        unsafe { n3_free(&mut self.raw) };
    }
}

pub fn info() -> Result<LibraryBuffer, Error> {
    LibraryBuffer::from_call("info", |out| unsafe { n3_info(out) })
}

pub fn scan(source: &[u8]) -> Result<LibraryBuffer, Error> {
    let input = n3_buf::borrowed(source);
    LibraryBuffer::from_call("scan", |out| unsafe { n3_scan(&input, out) })
}

pub fn hash(bytes: &[u8]) -> Result<LibraryBuffer, Error> {
    let input = n3_buf::borrowed(bytes);
    LibraryBuffer::from_call("hash", |out| unsafe { n3_hash(&input, out) })
}

pub fn normalize(text: &[u8]) -> Result<LibraryBuffer, Error> {
    let input = n3_buf::borrowed(text);
    LibraryBuffer::from_call("normalize", |out| unsafe { n3_normalize(&input, out) })
}

pub fn chunk_plan(text: &[u8], max_chars: u32, overlap: u32) -> Result<LibraryBuffer, Error> {
    let input = n3_buf::borrowed(text);
    let options = n3_chunk_options { max_chars, overlap };
    LibraryBuffer::from_call("chunk_plan", |out| unsafe {
        n3_chunk_plan(&input, &options, out)
    })
    .map_err(|err| match err.kind() {
        ErrorKind::Usage => err.with_hint(format!(
            "overlap ({overlap}) must be below max_chars ({max_chars}) and the text must be UTF-8."
        )),
        _ => err,
    })
}

pub fn exec_ir(ir: &[u8], config: Option<&[u8]>) -> Result<LibraryBuffer, Error> {
    let input = n3_buf::borrowed(ir);
    let config = config.map(n3_buf::borrowed).unwrap_or_default();
    LibraryBuffer::from_call("exec_ir", |out| unsafe { n3_exec_ir(&input, &config, out) })
}

fn status_error(op: &str, status: n3_status, kind: ErrorKind) -> Error {
    let err = Error::new(kind).with_message(format!("{op} returned {}", status.name()));
    match kind {
        ErrorKind::NotImplemented => {
            err.with_hint("This build does not include the operation; check `n3-native info`.")
        }
        ErrorKind::Usage => err.with_hint("Check the input bytes and options passed to the call."),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::{chunk_plan, hash, info, normalize};
    use crate::core::error::ErrorKind;

    #[test]
    fn hash_through_abi_matches_backend() {
        let out = hash(b"embed-check").expect("hash");
        assert_eq!(
            out.as_bytes(),
            crate::core::hash::hex_digest(b"embed-check").as_bytes()
        );
    }

    #[test]
    fn empty_normalize_output_is_empty_buffer() {
        let out = normalize(b"  \n\n").expect("normalize");
        assert!(out.is_empty());
        assert_eq!(out.as_bytes(), b"");
    }

    #[test]
    fn invalid_options_surface_usage_error() {
        let err = chunk_plan(b"text", 5, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap_or("").contains("N3_STATUS_INVALID_ARGUMENT"));
        assert!(err.hint().unwrap_or("").contains("overlap (5)"));
    }

    #[test]
    fn into_vec_copies_payload() {
        let bytes = info().expect("info").into_vec();
        assert!(bytes.starts_with(b"{\"abi_version\":1,"));
    }
}
