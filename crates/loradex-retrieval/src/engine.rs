//! The retrieval engine: filter, score, rank, select.
//!
//! # Algorithm
//!
//! 1. Validate the query and parameters (before touching the store).
//! 2. Stream every record; keep those with `strength <= max_strength` and
//!    `consistency >= min_consistency`.
//! 3. Represent the query once, score every surviving candidate.
//! 4. Sort by score descending, ties by ascending key string.
//! 5. Keep the first `top_k` and number them from 1.

use crate::config::{ConfigOverrides, RetrievalConfig};
use crate::scoring::ScoringContract;
use crate::types::RetrievalParams;
use loradex_core::{Error, FingerprintVector, Result, RetrievalResult, Row};
use loradex_store::RecordStore;

/// Device a configuration falls back to when the scorer cannot use CUDA.
pub const FALLBACK_DEVICE: &str = "cpu";

struct Candidate {
    key: String,
    row: Row,
    vector: FingerprintVector,
    score: f64,
}

/// Rank the store's records against `query`.
///
/// Returns at most `params.top_k` results, best first, with ranks `1..=N`.
/// An empty result list is success. Scorer failures come back as
/// [`Error::Scorer`] holding the scorer's own error.
pub fn retrieve<S>(
    store: &RecordStore,
    query: &str,
    params: &RetrievalParams,
    config: &RetrievalConfig,
    scorer: &S,
) -> Result<Vec<RetrievalResult>>
where
    S: ScoringContract + ?Sized,
{
    if query.trim().is_empty() {
        return Err(Error::validation("query must be a non-empty string"));
    }
    params.validate()?;

    let mut candidates = Vec::new();
    for record in store.iter() {
        let record = record?;
        let vector = record.fingerprint()?.clone();
        if !params.accepts(vector.strength(), vector.consistency()) {
            continue;
        }
        candidates.push(Candidate {
            key: record.key.to_string(),
            row: record.row,
            vector,
            score: 0.0,
        });
    }

    if candidates.is_empty() {
        log::debug!(
            "No candidates within strength <= {} and consistency >= {}",
            params.max_strength,
            params.min_consistency
        );
        return Ok(Vec::new());
    }

    let config = resolve_device(config, scorer);
    let representation = scorer.represent(query, &config).map_err(Error::scorer)?;

    for candidate in &mut candidates {
        let score = scorer
            .score(&representation, candidate.vector.direction())
            .map_err(Error::scorer)?;
        if !score.is_finite() {
            return Err(Error::validation(format!(
                "scorer '{}' returned non-finite score {score} for key {}",
                scorer.name(),
                candidate.key
            )));
        }
        candidate.score = score;
    }

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.key.cmp(&b.key))
    });
    candidates.truncate(params.top_k);

    log::debug!(
        "Scored query with '{}'; returning {} result(s)",
        scorer.name(),
        candidates.len()
    );

    let key_column = store.schema().key_column();
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            Ok(RetrievalResult::from_row(c.row, c.score, key_column)?
                .with_rank(i + 1)?
                .with_vector(c.vector))
        })
        .collect()
}

/// Fall back to CPU when CUDA is requested but the scorer cannot use it.
fn resolve_device<S>(config: &RetrievalConfig, scorer: &S) -> RetrievalConfig
where
    S: ScoringContract + ?Sized,
{
    if config.device().contains("cuda") && !scorer.supports_device(config.device()) {
        log::warn!(
            "Device '{}' requested but not available to scorer '{}'; falling back to {FALLBACK_DEVICE}",
            config.device(),
            scorer.name()
        );
        return config.with_overrides(ConfigOverrides::new().device(FALLBACK_DEVICE));
    }
    config.clone()
}

// ============================================================================
// RetrievalEngine
// ============================================================================

/// A scorer bundled with its configuration.
#[derive(Debug, Clone)]
pub struct RetrievalEngine<S> {
    scorer: S,
    config: RetrievalConfig,
}

impl<S: ScoringContract> RetrievalEngine<S> {
    /// Create an engine with the default configuration.
    pub fn new(scorer: S) -> Self {
        Self {
            scorer,
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration passed to the scorer.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The scoring contract.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Run [`retrieve`] with this engine's scorer and configuration.
    pub fn retrieve(
        &self,
        store: &RecordStore,
        query: &str,
        params: &RetrievalParams,
    ) -> Result<Vec<RetrievalResult>> {
        retrieve(store, query, params, &self.config, &self.scorer)
    }
}

// ============================================================================
// Tests
// ============================================================================
