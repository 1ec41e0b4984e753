#![forbid(unsafe_code)]

//! Browser adapter for the flowpatch usability patches.
//!
//! The decisions live in `flowpatch-core`; this crate performs them against
//! the live editor page. [`bridge`] converts browser values into the core
//! model and is plain Rust; the `wasm-bindgen` entry point is only built for
//! `wasm32` targets.

pub mod bridge;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{WebPatches, install, start};
