//! Retrieval engine for Loradex.
//!
//! Ranks the records of a [`loradex_store::RecordStore`] against a text
//! query. The expensive parts (turning the query into a representation,
//! scoring a representation against a direction vector) sit behind the
//! [`ScoringContract`] trait; the engine only filters, orders and selects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   loradex-retrieval                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  retrieve / RetrievalEngine                                 │
//! │  (validate → filter → represent → score → sort → top-k)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScoringContract trait                                      │
//! │  └── VectorScorer<E: QueryEncoder> + SimilarityMetric       │
//! │  QueryEncoder trait                                         │
//! │  ├── MockQueryEncoder (deterministic, for tests)            │
//! │  ├── FixedQueryEncoder (literal vector)                     │
//! │  └── PromptDiffEncoder<T: TextEmbedder>                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ModelCache (process-scoped, keyed by cache dir + device)   │
//! │  RetrievalConfig / RetrievalParams                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use loradex_retrieval::{
//!     retrieve, FixedQueryEncoder, RetrievalConfig, RetrievalParams,
//!     SimilarityMetric, VectorScorer,
//! };
//!
//! let scorer = VectorScorer::new(FixedQueryEncoder::new(query_vec), SimilarityMetric::Cosine);
//! let params = RetrievalParams::new().with_top_k(10);
//!
//! for hit in retrieve(&store, "watercolor", &params, &RetrievalConfig::default(), &scorer)? {
//!     println!("{:>2}. {} ({:.3})", hit.rank.unwrap_or(0), hit.key, hit.score);
//! }
//! ```

#![doc = include_str!("../README.md")]

pub mod cache;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod scoring;
pub mod types;

// Re-exports — engine
pub use engine::{RetrievalEngine, retrieve};

// Re-exports — configuration
pub use config::{ConfigOverrides, RetrievalConfig};
pub use types::RetrievalParams;

// Re-exports — scoring
pub use encoder::{
    FixedQueryEncoder, MockQueryEncoder, PromptDiffEncoder, QueryEncoder, TextEmbedder,
};
pub use scoring::{ScoreError, ScoringContract, SimilarityMetric, VectorScorer};

// Re-exports — cache
pub use cache::ModelCache;
