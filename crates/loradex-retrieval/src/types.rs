//! Retrieval parameters.

use loradex_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of results.
pub const DEFAULT_TOP_K: usize = 5;

/// Default strength ceiling; records above it are filtered out.
pub const DEFAULT_MAX_STRENGTH: f64 = 9.8;

/// Default consistency floor; records below it are filtered out.
pub const DEFAULT_MIN_CONSISTENCY: f64 = 0.041;

/// Per-query retrieval knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Maximum results to return.
    #[serde(default = "default_top_k", deserialize_with = "number_or_string")]
    pub top_k: usize,

    /// Keep records with `strength <= max_strength`.
    #[serde(default = "default_max_strength", deserialize_with = "number_or_string")]
    pub max_strength: f64,

    /// Keep records with `consistency >= min_consistency`.
    #[serde(default = "default_min_consistency", deserialize_with = "number_or_string")]
    pub min_consistency: f64,
}

/// Accept a number or its text form; environment overlays arrive as strings.
fn number_or_string<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString<T> {
        Number(T),
        Text(String),
    }

    match NumberOrString::<T>::deserialize(deserializer)? {
        NumberOrString::Number(v) => Ok(v),
        NumberOrString::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid number '{s}': {e}"))),
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_max_strength() -> f64 {
    DEFAULT_MAX_STRENGTH
}

fn default_min_consistency() -> f64 {
    DEFAULT_MIN_CONSISTENCY
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_strength: DEFAULT_MAX_STRENGTH,
            min_consistency: DEFAULT_MIN_CONSISTENCY,
        }
    }
}

impl RetrievalParams {
    /// Default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result limit.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the strength ceiling.
    pub fn with_max_strength(mut self, max_strength: f64) -> Self {
        self.max_strength = max_strength;
        self
    }

    /// Set the consistency floor.
    pub fn with_min_consistency(mut self, min_consistency: f64) -> Self {
        self.min_consistency = min_consistency;
        self
    }

    /// Check the parameters before any store access.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::validation("top_k must be > 0, got 0"));
        }
        if self.max_strength.is_nan() || self.min_consistency.is_nan() {
            return Err(Error::validation(
                "max_strength and min_consistency must not be NaN",
            ));
        }
        Ok(())
    }

    /// Whether a record with these metrics passes the filter.
    pub fn accepts(&self, strength: f64, consistency: f64) -> bool {
        strength <= self.max_strength && consistency >= self.min_consistency
    }
}
