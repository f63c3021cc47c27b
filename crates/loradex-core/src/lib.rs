//! Loradex Core — shared types, cell values, and errors.
//!
//! This crate provides the foundational types used across all Loradex crates.
//! It has no internal Loradex dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`value`]: Table cells and rows
//! - [`types`]: Fingerprints, adapter records, indexing and retrieval results

#![doc = include_str!("../README.md")]

pub mod error;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{BoxError, Error, Result};
pub use types::{
    AdapterRecord, DEFAULT_EMBED_DIM, FingerprintVector, IndexingResult, RetrievalResult, columns,
};
pub use value::{Row, Value, row_to_json};
