#[cfg(feature = "ffi")]
mod ffi;
mod filter;
mod truncate;
mod utils;
#[cfg(feature = "wasm")]
mod wasm;

pub use filter::*;
