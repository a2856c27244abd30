//! Purpose: C ABI bridge for host runtimes (libnamel3ss_native).
//! Exports: `n3_info`, `n3_scan`, `n3_hash`, `n3_normalize`, `n3_chunk_plan`, `n3_exec_ir`, `n3_free`.
//! Role: Stable ABI surface; marshals raw buffers and maps internal errors to status codes.
//! Invariants: Status values and `n3_buf` layout never change within an ABI version.
//! Invariants: The out-parameter is reset to the canonical empty buffer before any work,
//! Invariants: so every non-OK status leaves it empty and `n3_free` is always safe.
//! Invariants: Input bytes are only read during the call; outputs are released via `n3_free`.
//! Invariants: Panics never unwind across the boundary; they surface as `N3_STATUS_ERROR`.
//! Notes: Operations compiled out by Cargo features still export their symbol.
//! Notes: Every export is `unsafe`: callers vouch for the pointers; Rust code should go through `host`.
#![allow(non_camel_case_types)]

use crate::core::buffer::{InputView, OwnedBuf};
use crate::core::chunk::{ChunkOptions, ChunkPlanner};
use crate::core::error::{Error, ErrorKind};
use crate::core::hash::Sha256Hex;
use crate::core::info;
use crate::core::normalize::TextNormalizer;
use crate::core::transform::{self, Transform};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use tracing::{debug, trace, warn};

#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum n3_status {
    N3_STATUS_OK = 0,
    N3_STATUS_NOT_IMPLEMENTED = 1,
    N3_STATUS_INVALID_ARGUMENT = 2,
    N3_STATUS_INVALID_STATE = 3,
    N3_STATUS_ERROR = 4,
}

impl n3_status {
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotImplemented => Self::N3_STATUS_NOT_IMPLEMENTED,
            ErrorKind::Usage => Self::N3_STATUS_INVALID_ARGUMENT,
            ErrorKind::State => Self::N3_STATUS_INVALID_STATE,
            ErrorKind::Internal | ErrorKind::Io => Self::N3_STATUS_ERROR,
        }
    }

    /// Failure kind for a non-OK status.
    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            Self::N3_STATUS_OK => None,
            Self::N3_STATUS_NOT_IMPLEMENTED => Some(ErrorKind::NotImplemented),
            Self::N3_STATUS_INVALID_ARGUMENT => Some(ErrorKind::Usage),
            Self::N3_STATUS_INVALID_STATE => Some(ErrorKind::State),
            Self::N3_STATUS_ERROR => Some(ErrorKind::Internal),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::N3_STATUS_OK => "N3_STATUS_OK",
            Self::N3_STATUS_NOT_IMPLEMENTED => "N3_STATUS_NOT_IMPLEMENTED",
            Self::N3_STATUS_INVALID_ARGUMENT => "N3_STATUS_INVALID_ARGUMENT",
            Self::N3_STATUS_INVALID_STATE => "N3_STATUS_INVALID_STATE",
            Self::N3_STATUS_ERROR => "N3_STATUS_ERROR",
        }
    }
}

/// Pointer + length pair. Caller-owned when passed in, library-owned when written out.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct n3_buf {
    pub data: *const u8,
    pub len: usize,
}

impl n3_buf {
    pub const fn empty() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
        }
    }

    /// Borrow caller bytes for the duration of one call.
    pub fn borrowed(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self {
            data: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_null() && self.len == 0
    }
}

impl Default for n3_buf {
    fn default() -> Self {
        Self::empty()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct n3_chunk_options {
    pub max_chars: u32,
    pub overlap: u32,
}

static HASH: Sha256Hex = Sha256Hex;
static NORMALIZE: TextNormalizer = TextNormalizer;
#[cfg(feature = "scan")]
static SCAN: crate::core::scan::SourceScanner = crate::core::scan::SourceScanner;

/// Write the library info JSON into `out`.
///
/// # Safety
/// `out` must be null or point to a writable `n3_buf`. Any buffer previously held in `*out`
/// is overwritten without being released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_info(out: *mut n3_buf) -> n3_status {
    guarded("info", unsafe { out.as_mut() }, || info::info_json().map(OwnedBuf::new))
}

/// Tokenize UTF-8 source into a JSON token list.
///
/// # Safety
/// `input` must be null or point to an `n3_buf` whose `data` is valid for `len` bytes for the
/// duration of the call. `out` follows the same rules as in [`n3_info`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_scan(input: *const n3_buf, out: *mut n3_buf) -> n3_status {
    #[cfg(feature = "scan")]
    {
        unsafe { call_transform(&SCAN, input, out) }
    }
    #[cfg(not(feature = "scan"))]
    {
        let _ = input;
        guarded("scan", unsafe { out.as_mut() }, || Err(not_compiled("scan")))
    }
}

/// Hex SHA-256 of the input bytes.
///
/// # Safety
/// Same contract as [`n3_scan`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_hash(input: *const n3_buf, out: *mut n3_buf) -> n3_status {
    unsafe { call_transform(&HASH, input, out) }
}

/// # Safety
/// Same contract as [`n3_scan`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_normalize(input: *const n3_buf, out: *mut n3_buf) -> n3_status {
    unsafe { call_transform(&NORMALIZE, input, out) }
}

/// Plan overlapping chunks over UTF-8 text; the plan is json-v1.
///
/// # Safety
/// Same contract as [`n3_scan`]; `options` must be null or point to a readable
/// `n3_chunk_options`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_chunk_plan(
    input: *const n3_buf,
    options: *const n3_chunk_options,
    out: *mut n3_buf,
) -> n3_status {
    let raw_input = unsafe { read_raw(input) };
    let raw_options = if options.is_null() {
        None
    } else {
        Some(unsafe { options.read() })
    };
    guarded("chunk_plan", unsafe { out.as_mut() }, || {
        let raw_options = raw_options
            .ok_or_else(|| Error::new(ErrorKind::Usage).with_message("options is null"))?;
        let options = ChunkOptions::new(raw_options.max_chars, raw_options.overlap)?;
        let view = unsafe { input_view(raw_input) }?;
        debug!(
            op = "chunk_plan",
            input_len = view.len(),
            max_chars = raw_options.max_chars,
            overlap = raw_options.overlap,
            "planning chunks"
        );
        transform::run(&ChunkPlanner::new(options), view)
    })
}

/// Execute flow IR with an optional config document.
///
/// # Safety
/// `ir` and `config` follow the `input` rules of [`n3_scan`]; `out` those of [`n3_info`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_exec_ir(
    ir: *const n3_buf,
    config: *const n3_buf,
    out: *mut n3_buf,
) -> n3_status {
    let raw_ir = unsafe { read_raw(ir) };
    let raw_config = unsafe { read_raw(config) };
    #[cfg(feature = "exec")]
    {
        use crate::core::exec::{ExecConfig, IrExecutor};
        guarded("exec_ir", unsafe { out.as_mut() }, || {
            let config = ExecConfig::parse(unsafe { input_view(raw_config) }?.as_bytes())?;
            let view = unsafe { input_view(raw_ir) }?;
            debug!(op = "exec_ir", input_len = view.len(), "executing ir");
            transform::run(&IrExecutor::new(config), view)
        })
    }
    #[cfg(not(feature = "exec"))]
    {
        let _ = (raw_ir, raw_config);
        guarded("exec_ir", unsafe { out.as_mut() }, || Err(not_compiled("exec_ir")))
    }
}

/// Release a buffer written by one of the operations above and reset it to empty.
///
/// # Safety
/// `buf` must be null or point to an `n3_buf` that is either empty or was written by this
/// library and not yet released. Caller-owned memory must never be passed here.
///
/// Safe Rust cannot hand a borrowed view to release:
///
/// ```compile_fail
/// use namel3ss_native::abi::{n3_buf, n3_free};
///
/// let owned = vec![1u8, 2, 3];
/// let mut view = n3_buf::borrowed(&owned);
/// n3_free(&mut view);
/// ```
#[unsafe(no_mangle)]
pub unsafe extern "C" fn n3_free(buf: *mut n3_buf) {
    if buf.is_null() {
        return;
    }
    let raw = unsafe { buf.read() };
    if raw.is_empty() {
        return;
    }
    if let Some(owned) = unsafe { OwnedBuf::from_raw(raw.data, raw.len) } {
        trace!(len = owned.len(), "releasing output buffer");
        drop(owned);
    }
    unsafe {
        buf.write(n3_buf::empty());
    }
}

/// # Safety
/// `input` must satisfy the contract of [`n3_scan`].
unsafe fn call_transform(
    backend: &dyn Transform,
    input: *const n3_buf,
    out: *mut n3_buf,
) -> n3_status {
    let raw = unsafe { read_raw(input) };
    let op = backend.name();
    guarded(op, unsafe { out.as_mut() }, || {
        let view = unsafe { input_view(raw) }?;
        debug!(op, input_len = view.len(), "running transform");
        transform::run(backend, view)
    })
}

/// Copy the caller's descriptor before `out` is touched, in case both point at the same buffer.
unsafe fn read_raw(input: *const n3_buf) -> n3_buf {
    if input.is_null() {
        return n3_buf::empty();
    }
    unsafe { input.read() }
}

/// # Safety
/// `raw.data` must be valid for `raw.len` bytes for `'a`.
unsafe fn input_view<'a>(raw: n3_buf) -> Result<InputView<'a>, Error> {
    unsafe { InputView::from_raw(raw.data, raw.len) }
}

fn guarded<F>(op: &'static str, out: Option<&mut n3_buf>, body: F) -> n3_status
where
    F: FnOnce() -> Result<OwnedBuf, Error>,
{
    let Some(out) = out else {
        debug!(op, "rejected call with null out buffer");
        return n3_status::N3_STATUS_INVALID_ARGUMENT;
    };
    *out = n3_buf::empty();

    let result = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        warn!(op, "panic caught at ABI boundary");
        Err(Error::new(ErrorKind::Internal).with_message("panic at ABI boundary"))
    });

    match result {
        Ok(owned) => {
            let (data, len) = owned.into_raw();
            *out = n3_buf { data, len };
            debug!(op, out_len = len, "call succeeded");
            n3_status::N3_STATUS_OK
        }
        Err(err) => {
            let status = n3_status::from_kind(err.kind());
            debug!(op, status = status.name(), error = %err, "call failed");
            status
        }
    }
}

#[cfg(any(not(feature = "scan"), not(feature = "exec")))]
fn not_compiled(op: &str) -> Error {
    Error::new(ErrorKind::NotImplemented)
        .with_message(format!("{op} is not compiled into this build"))
}
