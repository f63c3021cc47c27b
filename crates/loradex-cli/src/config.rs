//! Configuration for the `loradex` binary.
//!
//! Provides the [`LoradexConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `LORADEX_CONFIG` environment variable
//! 3. XDG default: `~/.config/loradex/config.toml`
//! 4. Built-in defaults
//!
//! `LORADEX_<SECTION>_<KEY>` environment variables overlay the file, e.g.
//! `LORADEX_PARAMS_TOP_K=3` or `LORADEX_RETRIEVAL_DEVICE=cpu`. Numeric
//! parameters accept their string form.

use confyg::{Confygery, env};
use loradex_core::{Error, Result};
use loradex_retrieval::{RetrievalConfig, RetrievalParams, SimilarityMetric};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LORADEX_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration.
///
/// ```toml
/// [retrieval]
/// working_directory = "./loradex_working_directory"
/// device = "cuda"
///
/// [params]
/// top_k = 5
/// max_strength = 9.8
/// min_consistency = 0.041
///
/// [scoring]
/// metric = "cosine"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoradexConfig {
    /// Working directory, model cache and device.
    pub retrieval: RetrievalConfig,

    /// Default retrieval parameters for `loradex query`.
    pub params: RetrievalParams,

    /// Scoring configuration.
    pub scoring: ScoringConfig,
}

/// Scoring configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Similarity metric for vector queries.
    pub metric: SimilarityMetric,
}

// ============================================================================
// Config loading
// ============================================================================

impl LoradexConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            log::debug!("Loading config from {}", path.display());
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("LORADEX");
        env_opts.add_section("retrieval");
        env_opts.add_section("params");
        env_opts.add_section("scoring");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("loradex").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
