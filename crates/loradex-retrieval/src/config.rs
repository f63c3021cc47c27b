//! Retrieval configuration.
//!
//! [`RetrievalConfig`] is immutable once built; callers derive adjusted
//! copies with [`RetrievalConfig::with_overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default working directory for model caches and scratch files.
pub const DEFAULT_WORKING_DIRECTORY: &str = "./loradex_working_directory";

/// Subdirectory of the working directory used for cached models.
pub const MODELS_CACHE_SUBDIR: &str = "models_cache";

/// Default compute device handed to scoring contracts.
pub const DEFAULT_DEVICE: &str = "cuda";

/// Where and on what device scoring collaborators run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_working_directory")]
    working_directory: PathBuf,

    /// Explicit model cache directory; derived from the working directory if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    models_cache_dir: Option<PathBuf>,

    #[serde(default = "default_device")]
    device: String,
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(DEFAULT_WORKING_DIRECTORY)
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            working_directory: default_working_directory(),
            models_cache_dir: None,
            device: default_device(),
        }
    }
}

impl RetrievalConfig {
    /// Create a config rooted at `working_directory` with default device.
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            ..Default::default()
        }
    }

    /// Root for model caches and scratch files.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Model cache directory (`<working_directory>/models_cache` unless set).
    pub fn models_cache_dir(&self) -> PathBuf {
        self.models_cache_dir
            .clone()
            .unwrap_or_else(|| self.working_directory.join(MODELS_CACHE_SUBDIR))
    }

    /// Compute device, e.g. `cuda` or `cpu`.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Derive a copy where every `Some` field of `overrides` replaces ours.
    pub fn with_overrides(&self, overrides: ConfigOverrides) -> Self {
        Self {
            working_directory: overrides
                .working_directory
                .unwrap_or_else(|| self.working_directory.clone()),
            models_cache_dir: overrides
                .models_cache_dir
                .or_else(|| self.models_cache_dir.clone()),
            device: overrides.device.unwrap_or_else(|| self.device.clone()),
        }
    }
}

/// Field overrides for [`RetrievalConfig::with_overrides`]; `None` keeps the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement working directory.
    pub working_directory: Option<PathBuf>,
    /// Replacement model cache directory.
    pub models_cache_dir: Option<PathBuf>,
    /// Replacement compute device.
    pub device: Option<String>,
}

impl ConfigOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the working directory.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Override the model cache directory.
    pub fn models_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_cache_dir = Some(path.into());
        self
    }

    /// Override the device.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
