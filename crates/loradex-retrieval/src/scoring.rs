//! The scoring contract and reference scorers.
//!
//! A [`ScoringContract`] is the pluggable pair the engine calls: one
//! `represent` per query, then one `score` per candidate. Both are opaque,
//! may be expensive, and report failures as boxed errors that the engine
//! passes through unchanged.

use crate::config::RetrievalConfig;
use crate::encoder::QueryEncoder;
use loradex_core::BoxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Query → representation, representation × direction → score.
pub trait ScoringContract {
    /// Whatever `represent` produces and `score` consumes.
    type Representation;

    /// Build the query representation. Called once per query.
    fn represent(
        &self,
        query: &str,
        config: &RetrievalConfig,
    ) -> Result<Self::Representation, BoxError>;

    /// Score one candidate direction; higher is better.
    fn score(
        &self,
        representation: &Self::Representation,
        direction: &[f32],
    ) -> Result<f64, BoxError>;

    /// Whether the contract can run on `device`.
    fn supports_device(&self, device: &str) -> bool {
        let _ = device;
        true
    }

    /// The scorer name for diagnostics.
    fn name(&self) -> &str;
}

/// Failures raised by the reference scorers and encoders.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// Representation and direction lengths differ.
    #[error("dimension mismatch: representation has {expected}, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The encoder produced an empty vector.
    #[error("query representation is empty")]
    EmptyRepresentation,

    /// A prompt-diff encoder was built without prompts.
    #[error("no reference prompts configured")]
    NoPrompts,

    /// The embedder returned a different number of vectors than texts.
    #[error("embedder returned {actual} vectors for {expected} texts")]
    BatchSize { expected: usize, actual: usize },

    /// A metric name that does not parse.
    #[error("unknown similarity metric '{0}' (expected cosine or dot)")]
    UnknownMetric(String),
}

// ============================================================================
// SimilarityMetric
// ============================================================================

/// Vector similarity used by [`VectorScorer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity; zero-norm inputs score 0.
    #[default]
    Cosine,
    /// Raw dot product.
    DotProduct,
}

impl SimilarityMetric {
    /// Similarity of two equal-length vectors, accumulated in `f64`.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a
            .iter()
            .zip(b)
            .map(|(x, y)| f64::from(*x) * f64::from(*y))
            .sum();
        match self {
            SimilarityMetric::DotProduct => dot,
            SimilarityMetric::Cosine => {
                let na = norm(a);
                let nb = norm(b);
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot / (na * nb)
                }
            }
        }
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Cosine => f.write_str("cosine"),
            SimilarityMetric::DotProduct => f.write_str("dot"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" | "cos" => Ok(Self::Cosine),
            "dot" | "dot_product" | "dotproduct" => Ok(Self::DotProduct),
            other => Err(ScoreError::UnknownMetric(other.to_string())),
        }
    }
}

// ============================================================================
// VectorScorer
// ============================================================================

/// A [`ScoringContract`] pairing a [`QueryEncoder`] with a [`SimilarityMetric`].
#[derive(Debug, Clone)]
pub struct VectorScorer<E> {
    encoder: E,
    metric: SimilarityMetric,
    name: String,
}

impl<E: QueryEncoder> VectorScorer<E> {
    /// Create a scorer.
    pub fn new(encoder: E, metric: SimilarityMetric) -> Self {
        let name = format!("{}+{metric}", encoder.name());
        Self {
            encoder,
            metric,
            name,
        }
    }

    /// The query encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// The similarity metric.
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }
}

impl<E: QueryEncoder> ScoringContract for VectorScorer<E> {
    type Representation = Vec<f32>;

    fn represent(&self, query: &str, config: &RetrievalConfig) -> Result<Vec<f32>, BoxError> {
        let representation = self.encoder.encode(query, config)?;
        if representation.is_empty() {
            return Err(Box::new(ScoreError::EmptyRepresentation));
        }
        Ok(representation)
    }

    fn score(&self, representation: &Vec<f32>, direction: &[f32]) -> Result<f64, BoxError> {
        if representation.len() != direction.len() {
            return Err(Box::new(ScoreError::DimensionMismatch {
                expected: representation.len(),
                actual: direction.len(),
            }));
        }
        Ok(self.metric.score(representation, direction))
    }

    fn supports_device(&self, device: &str) -> bool {
        self.encoder.supports_device(device)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Tests
// ============================================================================
