//! Purpose: Content hashing backend for `n3_hash`.
//! Exports: `Sha256Hex`, `hex_digest`.
//! Role: Deterministic fingerprint of raw bytes, returned as ASCII.
//! Invariants: Output is always 64 lowercase hex characters.
//! Invariants: No state survives between calls.
use crate::core::error::Error;
use crate::core::transform::Transform;
use sha2::{Digest, Sha256};

pub const HASH_ALGORITHM: &str = "sha256";

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hex;

impl Transform for Sha256Hex {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(hex_digest(input).into_bytes())
    }
}

pub fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
