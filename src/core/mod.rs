// Backends and shared primitives behind the C ABI: buffers, errors, and transforms.
pub mod buffer;
pub mod chunk;
pub mod error;
#[cfg(feature = "exec")]
pub mod exec;
pub mod hash;
pub mod info;
pub mod normalize;
#[cfg(feature = "scan")]
pub mod scan;
pub mod transform;
