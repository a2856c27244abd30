//! Purpose: Native acceleration library for namel3ss, exposed as a C ABI and as a Rust crate.
//! Exports: `abi` (extern "C" surface), `core` (backends, buffers, errors), `host` (safe caller).
//! Role: Built as cdylib/staticlib for foreign hosts and as rlib for the `n3-native` CLI and tests.
//! Invariants: Every exported entry point is stateless and never unwinds across the boundary.
//! Invariants: Output buffers are owned by this library until released through `n3_free`.
pub mod abi;
pub mod core;
pub mod host;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
