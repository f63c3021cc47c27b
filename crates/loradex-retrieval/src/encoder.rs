//! Query encoders: text query → representation vector.
//!
//! # Encoders
//!
//! - `MockQueryEncoder`: Deterministic fixed-dimension vectors for testing
//! - `FixedQueryEncoder`: Returns a caller-supplied vector for every query
//! - `PromptDiffEncoder`: Averages the embedding shift a query causes when
//!   appended to a set of reference prompts

use crate::config::RetrievalConfig;
use crate::scoring::ScoreError;
use loradex_core::BoxError;

/// Turns a query string into a representation vector.
pub trait QueryEncoder {
    /// Encode one query.
    fn encode(&self, query: &str, config: &RetrievalConfig) -> Result<Vec<f32>, BoxError>;

    /// Output dimension, when fixed.
    fn dimension(&self) -> Option<usize> {
        None
    }

    /// Whether the encoder can run on `device`.
    fn supports_device(&self, device: &str) -> bool {
        let _ = device;
        true
    }

    /// The encoder name for diagnostics.
    fn name(&self) -> &str;
}

/// Batch text embedding backend (e.g. a CLIP text tower).
pub trait TextEmbedder {
    /// Embed each text; one vector per input, same order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BoxError>;
}

// ============================================================================
// MockQueryEncoder
// ============================================================================

/// A mock encoder for testing.
///
/// Generates deterministic unit vectors from the query bytes, so the same
/// query always maps to the same representation.
#[derive(Debug, Clone)]
pub struct MockQueryEncoder {
    dimension: usize,
}

impl MockQueryEncoder {
    /// Create a new mock encoder with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn deterministic_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let bytes = text.as_bytes();

        for (i, val) in vector.iter_mut().enumerate() {
            let byte_val = if bytes.is_empty() {
                0u8
            } else {
                bytes[i % bytes.len()]
            };
            *val = ((byte_val as f32 + i as f32) % 256.0) / 256.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vector {
                *val /= norm;
            }
        }
        vector
    }
}

impl QueryEncoder for MockQueryEncoder {
    fn encode(&self, query: &str, _config: &RetrievalConfig) -> Result<Vec<f32>, BoxError> {
        Ok(self.deterministic_vector(query))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl TextEmbedder for MockQueryEncoder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BoxError> {
        Ok(texts.iter().map(|t| self.deterministic_vector(t)).collect())
    }
}

// ============================================================================
// FixedQueryEncoder
// ============================================================================

/// Returns the same vector for every query.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedQueryEncoder {
    vector: Vec<f32>,
}

impl FixedQueryEncoder {
    /// Create an encoder that always returns `vector`.
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }

    /// The vector returned for every query.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

impl QueryEncoder for FixedQueryEncoder {
    fn encode(&self, _query: &str, _config: &RetrievalConfig) -> Result<Vec<f32>, BoxError> {
        if self.vector.is_empty() {
            return Err(Box::new(ScoreError::EmptyRepresentation));
        }
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.vector.len())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

// ============================================================================
// PromptDiffEncoder
// ============================================================================

/// Encodes a query as the mean embedding shift it induces on reference prompts.
///
/// For each prompt `p`: `embed(p + " " + query) - embed(p)`; the
/// representation is the mean of those differences. Both batches go through
/// the embedder in one call each.
pub struct PromptDiffEncoder<T> {
    embedder: T,
    prompts: Vec<String>,
}

impl<T: TextEmbedder> PromptDiffEncoder<T> {
    /// Create an encoder over `prompts`.
    pub fn new<I, S>(embedder: T, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            embedder,
            prompts: prompts.into_iter().map(Into::into).collect(),
        }
    }

    /// Reference prompts, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl<T: TextEmbedder> QueryEncoder for PromptDiffEncoder<T> {
    fn encode(&self, query: &str, _config: &RetrievalConfig) -> Result<Vec<f32>, BoxError> {
        if self.prompts.is_empty() {
            return Err(Box::new(ScoreError::NoPrompts));
        }

        let suffixed: Vec<String> = self
            .prompts
            .iter()
            .map(|p| format!("{p} {query}"))
            .collect();
        let raw = self.embedder.embed_batch(&self.prompts)?;
        let shifted = self.embedder.embed_batch(&suffixed)?;
        if raw.len() != self.prompts.len() || shifted.len() != self.prompts.len() {
            return Err(Box::new(ScoreError::BatchSize {
                expected: self.prompts.len(),
                actual: raw.len().min(shifted.len()),
            }));
        }

        let dim = raw[0].len();
        let mut mean = vec![0.0f64; dim];
        for (r, s) in raw.iter().zip(&shifted) {
            for v in [r, s] {
                if v.len() != dim {
                    return Err(Box::new(ScoreError::DimensionMismatch {
                        expected: dim,
                        actual: v.len(),
                    }));
                }
            }
            for (m, (a, b)) in mean.iter_mut().zip(r.iter().zip(s)) {
                *m += f64::from(*b) - f64::from(*a);
            }
        }

        let n = self.prompts.len() as f64;
        Ok(mean.into_iter().map(|m| (m / n) as f32).collect())
    }

    fn name(&self) -> &str {
        "prompt-diff"
    }
}

impl<T> std::fmt::Debug for PromptDiffEncoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptDiffEncoder")
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
