//! Codec layer: the custom DES variant and deflate decompression.
//!
//! # Submodules
//!
//! - [`des`][]: block cipher (header-only and mixed modes, shuffle-decode)
//! - [`compression`][]: zlib inflate with exact-size validation

pub mod compression;
pub mod des;
