//! Purpose: Self-describing payload for `n3_info`.
//! Exports: `ABI_VERSION`, `LibraryInfo`, `capabilities`, `info_json`.
//! Role: Lets hosts negotiate which operations this build provides.
//! Invariants: `capabilities` lists only operations compiled into this build.
//! Invariants: JSON keys are sorted; fields are additive-only.
use crate::core::chunk::CHUNK_PLAN_ENCODING;
use crate::core::error::{Error, ErrorKind};
use crate::core::hash::HASH_ALGORITHM;
use serde::Serialize;

pub const ABI_VERSION: u32 = 1;
pub const LIBRARY_NAME: &str = "namel3ss-native";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LibraryInfo {
    pub abi_version: u32,
    pub capabilities: Vec<&'static str>,
    pub chunk_plan_encoding: &'static str,
    pub hash_algorithm: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

impl LibraryInfo {
    pub fn current() -> Self {
        Self {
            abi_version: ABI_VERSION,
            capabilities: capabilities(),
            chunk_plan_encoding: CHUNK_PLAN_ENCODING,
            hash_algorithm: HASH_ALGORITHM,
            name: LIBRARY_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub fn capabilities() -> Vec<&'static str> {
    let mut caps = vec!["info"];
    if cfg!(feature = "scan") {
        caps.push("scan");
    }
    caps.extend(["hash", "normalize", "chunk_plan"]);
    if cfg!(feature = "exec") {
        caps.push("exec_ir");
    }
    caps
}

pub fn info_json() -> Result<Vec<u8>, Error> {
    serde_json::to_vec(&LibraryInfo::current()).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode library info")
            .with_source(err)
    })
}
