//! Purpose: Seam between the ABI boundary and the algorithms behind each entry point.
//! Exports: `Transform`, `run`.
//! Role: Backends turn bytes into bytes; the ABI layer only drives this trait.
//! Invariants: Implementations are deterministic, synchronous, and reentrant.
//! Invariants: Implementations never keep references to input past `apply`.
use crate::core::buffer::{InputView, OwnedBuf};
use crate::core::error::Error;

pub trait Transform: Send + Sync {
    /// Stable operation name used in logs and the capability list.
    fn name(&self) -> &'static str;

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Apply a backend to borrowed input and wrap the result as library-owned output.
pub fn run(transform: &dyn Transform, input: InputView<'_>) -> Result<OwnedBuf, Error> {
    transform.apply(input.as_bytes()).map(OwnedBuf::new)
}
