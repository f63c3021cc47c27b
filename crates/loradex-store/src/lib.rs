//! Record store for Loradex.
//!
//! A [`RecordStore`] is a columnar table keyed by an integer column
//! (`version_id` by default). Every upsert is validated and coerced against
//! a [`StoreSchema`]; direction vectors go through the [`codec`] so a
//! persisted vector decodes bit-identical at single precision.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     loradex-store                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RecordStore (upsert / get / get_by / iter / stats)         │
//! │  ├── StoreSchema (required columns, canonical coercion)     │
//! │  └── Table (typed columns + key → row indices)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  codec (f32-canonical direction vectors)                    │
//! │  snapshot (Parquet save/load, copy_snapshot)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![doc = include_str!("../README.md")]

pub mod codec;
pub mod schema;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod table;

// Re-exports — store
pub use schema::StoreSchema;
pub use store::{RecordStore, StoredRecord};
pub use table::{Column, ColumnData, ColumnKind, Table};

// Re-exports — snapshot and stats
pub use snapshot::{copy_snapshot, has_snapshot_extension};
pub use stats::{MetricSummary, StoreStats};
