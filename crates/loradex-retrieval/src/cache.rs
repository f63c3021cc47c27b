//! Process-scoped model cache.
//!
//! Scoring collaborators often need a heavyweight model (e.g. a text
//! encoder) that should be loaded once per `(models_cache_dir, device)` and
//! shared. [`ModelCache`] is an explicit value the caller owns and passes
//! around; there is no global instance.
//!
//! # Thread Safety
//!
//! The map sits behind a `Mutex` that is held only for lookups and
//! insertion, never while a model loads. Two threads racing on the same key
//! may both load; the first to insert wins and the other's model is dropped.

use crate::config::RetrievalConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cache key: model cache directory and device.
pub type CacheKey = (PathBuf, String);

/// Get-or-create cache of shared models.
pub struct ModelCache<M> {
    models: Mutex<HashMap<CacheKey, Arc<M>>>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
        }
    }
}

impl<M> ModelCache<M> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key a config maps to.
    pub fn key_for(config: &RetrievalConfig) -> CacheKey {
        (config.models_cache_dir(), config.device().to_string())
    }

    /// Cached model for `config`, if loaded.
    pub fn get(&self, config: &RetrievalConfig) -> Option<Arc<M>> {
        self.lock().get(&Self::key_for(config)).cloned()
    }

    /// Cached model for `config`, loading it with `load` on a miss.
    ///
    /// `load` receives the model cache directory and device. Load failures
    /// are returned as-is and nothing is cached.
    pub fn get_or_load<F, E>(&self, config: &RetrievalConfig, load: F) -> Result<Arc<M>, E>
    where
        F: FnOnce(&Path, &str) -> Result<M, E>,
    {
        let key = Self::key_for(config);
        if let Some(model) = self.lock().get(&key) {
            return Ok(Arc::clone(model));
        }

        log::debug!(
            "Loading model for device '{}' (cache dir {})",
            key.1,
            key.0.display()
        );
        let model = load(&key.0, &key.1)?;

        let mut models = self.lock();
        let entry = models.entry(key).or_insert_with(|| Arc::new(model));
        Ok(Arc::clone(entry))
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no model is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock leaves the map itself intact.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<M>>> {
        self.models.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M> std::fmt::Debug for ModelCache<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("models", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
