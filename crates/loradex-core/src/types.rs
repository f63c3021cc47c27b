//! Value types shared by the store and the retrieval engine.
//!
//! - [`FingerprintVector`]: validated direction + strength + consistency
//! - [`AdapterRecord`]: typed row schema with an opaque extras bag
//! - [`IndexingResult`]: what an indexing collaborator hands to the store
//! - [`RetrievalResult`]: one ranked answer to a query

use crate::value::{Row, Value, row_to_json};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default expected direction dimension for [`FingerprintVector::from_parts`].
pub const DEFAULT_EMBED_DIM: usize = 512;

// ============================================================================
// Column names
// ============================================================================

/// Column names of the default record schema.
pub mod columns {
    /// Key column.
    pub const VERSION_ID: &str = "version_id";
    /// Parent model identifier.
    pub const MODEL_ID: &str = "model_id";
    /// Human-readable model name.
    pub const MODEL_NAME: &str = "model_name";
    /// Working folder name of the adapter.
    pub const FOLDER_NAME: &str = "folder_name";
    /// Free-text model description.
    pub const MODEL_DESCRIPTION: &str = "model_description";
    /// Download count reported upstream.
    pub const MODEL_DOWNLOAD_COUNT: &str = "model_download_count";
    /// Content rating level reported upstream.
    pub const MODEL_NSFW_LEVEL: &str = "model_nsfw_level";
    /// Direction vector (storage form).
    pub const DIRECTION: &str = "direction";
    /// Strength metric.
    pub const STRENGTH: &str = "strength";
    /// Consistency metric.
    pub const CONSISTENCY: &str = "consistency";

    /// Every column a default-schema row must carry, in snapshot order.
    pub const DEFAULT_REQUIRED: [&str; 10] = [
        VERSION_ID,
        MODEL_ID,
        MODEL_NAME,
        FOLDER_NAME,
        MODEL_DESCRIPTION,
        MODEL_DOWNLOAD_COUNT,
        MODEL_NSFW_LEVEL,
        DIRECTION,
        STRENGTH,
        CONSISTENCY,
    ];
}

// ============================================================================
// FingerprintVector
// ============================================================================

/// Compact behavioral representation of an adapter.
///
/// `direction` is canonical at single precision. Construction rejects empty
/// directions and any non-finite element or scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintVector {
    direction: Vec<f32>,
    strength: f64,
    consistency: f64,
}

impl FingerprintVector {
    /// Create a validated fingerprint.
    pub fn new(direction: Vec<f32>, strength: f64, consistency: f64) -> Result<Self> {
        if direction.is_empty() {
            return Err(Error::validation("direction must be non-empty"));
        }
        if let Some(i) = direction.iter().position(|x| !x.is_finite()) {
            return Err(Error::validation(format!(
                "direction[{i}] must be finite, got {}",
                direction[i]
            )));
        }
        if !strength.is_finite() {
            return Err(Error::validation(format!(
                "strength must be finite, got {strength}"
            )));
        }
        if !consistency.is_finite() {
            return Err(Error::validation(format!(
                "consistency must be finite, got {consistency}"
            )));
        }
        Ok(Self {
            direction,
            strength,
            consistency,
        })
    }

    /// Build from double-precision parts, narrowing the direction to `f32`.
    ///
    /// When `expected_dim` is set the direction length must match it.
    pub fn from_parts(
        direction: &[f64],
        strength: f64,
        consistency: f64,
        expected_dim: Option<usize>,
    ) -> Result<Self> {
        if let Some(dim) = expected_dim
            && direction.len() != dim
        {
            return Err(Error::validation(format!(
                "expected direction dim {dim}, got {}",
                direction.len()
            )));
        }
        let narrowed = direction.iter().map(|&x| x as f32).collect();
        Self::new(narrowed, strength, consistency)
    }

    /// Direction vector.
    pub fn direction(&self) -> &[f32] {
        &self.direction
    }

    /// Magnitude of effect.
    pub fn strength(&self) -> f64 {
        self.strength
    }

    /// Coherence of effect.
    pub fn consistency(&self) -> f64 {
        self.consistency
    }

    /// Direction dimension.
    pub fn dim(&self) -> usize {
        self.direction.len()
    }

    /// Consume into the direction vector.
    pub fn into_direction(self) -> Vec<f32> {
        self.direction
    }
}

// ============================================================================
// AdapterRecord
// ============================================================================

/// Typed form of one default-schema row.
///
/// Fields the store does not interpret beyond presence live here with their
/// canonical types; anything else the caller wants persisted goes in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRecord {
    /// Key.
    pub version_id: i64,
    /// Parent model identifier.
    pub model_id: Option<i64>,
    /// Model name.
    pub model_name: Option<String>,
    /// Folder name.
    pub folder_name: Option<String>,
    /// Model description.
    pub model_description: Option<String>,
    /// Download count.
    pub model_download_count: Option<i64>,
    /// Content rating level.
    pub model_nsfw_level: Option<i64>,
    /// Fingerprint metrics.
    pub vector: FingerprintVector,
    /// Opaque caller-supplied columns.
    pub extra: BTreeMap<String, Value>,
}

impl AdapterRecord {
    /// Create a record with only the key and the fingerprint set.
    pub fn new(version_id: i64, vector: FingerprintVector) -> Self {
        Self {
            version_id,
            model_id: None,
            model_name: None,
            folder_name: None,
            model_description: None,
            model_download_count: None,
            model_nsfw_level: None,
            vector,
            extra: BTreeMap::new(),
        }
    }

    /// Set the model name.
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Set the folder name.
    pub fn with_folder_name(mut self, name: impl Into<String>) -> Self {
        self.folder_name = Some(name.into());
        self
    }

    /// Add an opaque extra column.
    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Flatten into a row carrying every default required column.
    ///
    /// Extras never shadow a schema column.
    pub fn to_row(&self) -> Row {
        let mut row: Row = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        row.insert(columns::VERSION_ID.into(), Value::Int(self.version_id));
        row.insert(columns::MODEL_ID.into(), self.model_id.into());
        row.insert(columns::MODEL_NAME.into(), self.model_name.clone().into());
        row.insert(columns::FOLDER_NAME.into(), self.folder_name.clone().into());
        row.insert(
            columns::MODEL_DESCRIPTION.into(),
            self.model_description.clone().into(),
        );
        row.insert(
            columns::MODEL_DOWNLOAD_COUNT.into(),
            self.model_download_count.into(),
        );
        row.insert(columns::MODEL_NSFW_LEVEL.into(), self.model_nsfw_level.into());
        insert_vector_columns(&mut row, &self.vector);
        row
    }
}

/// Overwrite the three fingerprint columns of `row` from `vector`.
pub fn insert_vector_columns(row: &mut Row, vector: &FingerprintVector) {
    row.insert(
        columns::DIRECTION.into(),
        Value::F32List(vector.direction().to_vec()),
    );
    row.insert(columns::STRENGTH.into(), Value::Float(vector.strength()));
    row.insert(columns::CONSISTENCY.into(), Value::Float(vector.consistency()));
}

// ============================================================================
// IndexingResult
// ============================================================================

/// Result of indexing a single adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexingResult {
    /// Identifier the indexing side chose for the adapter.
    pub adapter_id: String,
    /// Computed fingerprint; authoritative over any vector columns in `row`.
    pub vector: FingerprintVector,
    /// Row payload to store.
    pub row: Row,
}

impl IndexingResult {
    /// Create an indexing result.
    pub fn new(adapter_id: impl Into<String>, vector: FingerprintVector, row: Row) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            vector,
            row,
        }
    }

    /// The row to upsert: `row` with the vector columns taken from `vector`.
    pub fn to_row(&self) -> Row {
        let mut row = self.row.clone();
        insert_vector_columns(&mut row, &self.vector);
        row
    }
}

// ============================================================================
// RetrievalResult
// ============================================================================

/// One ranked answer to a retrieval query.
///
/// Row-first: `row` carries every stored column so callers can read metadata
/// without another lookup. Only the relative order of scores is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Record key, as a string.
    pub key: String,
    /// Higher is better.
    pub score: f64,
    /// 1-based rank among the returned results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    /// The stored row.
    pub row: Row,
    /// Decoded fingerprint of the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<FingerprintVector>,
    /// Debug signals; not part of the stored schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl RetrievalResult {
    /// Create a result; the score must be finite.
    pub fn new(key: impl Into<String>, score: f64, row: Row) -> Result<Self> {
        if !score.is_finite() {
            return Err(Error::validation(format!(
                "score must be finite, got {score}"
            )));
        }
        Ok(Self {
            key: key.into(),
            score,
            rank: None,
            row,
            vector: None,
            meta: BTreeMap::new(),
        })
    }

    /// Create a result whose key is read from `key_column` of `row`.
    pub fn from_row(row: Row, score: f64, key_column: &str) -> Result<Self> {
        let key = match row.get(key_column) {
            Some(value) => value.to_string(),
            None => return Err(Error::schema(key_column)),
        };
        Self::new(key, score, row)
    }

    /// Copy with `rank` set; ranks start at 1.
    pub fn with_rank(mut self, rank: usize) -> Result<Self> {
        if rank == 0 {
            return Err(Error::validation("rank must be >= 1, got 0"));
        }
        self.rank = Some(rank);
        Ok(self)
    }

    /// Attach the decoded fingerprint.
    pub fn with_vector(mut self, vector: FingerprintVector) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Attach a debug signal.
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Convenience access to a row field.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    /// JSON view with the row flattened to plain JSON values.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "key": self.key,
            "score": self.score,
            "rank": self.rank,
            "row": row_to_json(&self.row),
            "vector": self.vector.as_ref().map(|v| serde_json::json!({
                "direction": v.direction(),
                "strength": v.strength(),
                "consistency": v.consistency(),
            })),
            "meta": self.meta,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_x() -> FingerprintVector {
        FingerprintVector::new(vec![1.0, 0.0, 0.0], 1.0, 0.5).unwrap()
    }

    // ------------------------------------------------------------------------
    // FingerprintVector tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_fingerprint_new() {
        let v = unit_x();
        assert_eq!(v.dim(), 3);
        assert_eq!(v.direction(), &[1.0, 0.0, 0.0]);
        assert_eq!(v.strength(), 1.0);
        assert_eq!(v.consistency(), 0.5);
    }

    #[test]
    fn test_fingerprint_rejects_empty_direction() {
        let err = FingerprintVector::new(vec![], 1.0, 1.0).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_fingerprint_rejects_non_finite() {
        assert!(FingerprintVector::new(vec![f32::NAN], 1.0, 1.0).is_err());
        assert!(FingerprintVector::new(vec![1.0], f64::INFINITY, 1.0).is_err());
        assert!(FingerprintVector::new(vec![1.0], 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_fingerprint_from_parts_checks_dim() {
        let err = FingerprintVector::from_parts(&[0.0, 0.0, 1.0], 3.0, 0.9, Some(512));
        assert!(err.unwrap_err().to_string().contains("expected direction dim 512"));

        let v = FingerprintVector::from_parts(&[0.0, 0.0, 1.0], 3.0, 0.9, Some(3)).unwrap();
        assert_eq!(v.direction(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fingerprint_from_parts_narrows() {
        let v = FingerprintVector::from_parts(&[0.1], 1.0, 1.0, None).unwrap();
        assert_eq!(v.direction()[0], 0.1f32);
    }

    #[test]
    fn test_fingerprint_from_parts_rejects_overflow() {
        // Finite as f64, infinite once narrowed.
        assert!(FingerprintVector::from_parts(&[1e300], 1.0, 1.0, None).is_err());
    }

    // ------------------------------------------------------------------------
    // AdapterRecord / IndexingResult tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_adapter_record_to_row_has_required_columns() {
        let record = AdapterRecord::new(55, unit_x())
            .with_model_name("M")
            .with_extra("trigger", "pixel art");
        let row = record.to_row();

        for column in columns::DEFAULT_REQUIRED {
            assert!(row.contains_key(column), "missing {column}");
        }
        assert_eq!(row[columns::VERSION_ID], Value::Int(55));
        assert_eq!(row[columns::MODEL_ID], Value::Null);
        assert_eq!(row[columns::MODEL_NAME], Value::Str("M".into()));
        assert_eq!(row["trigger"], Value::Str("pixel art".into()));
    }

    #[test]
    fn test_adapter_record_extra_cannot_shadow_schema() {
        let record = AdapterRecord::new(1, unit_x()).with_extra(columns::STRENGTH, -1.0);
        let row = record.to_row();
        assert_eq!(row[columns::STRENGTH], Value::Float(1.0));
    }

    #[test]
    fn test_indexing_result_vector_overrides_row() {
        let mut row = Row::new();
        row.insert(columns::DIRECTION.into(), Value::F64List(vec![999.0]));
        row.insert(columns::STRENGTH.into(), Value::Int(-1));
        let vector = FingerprintVector::new(vec![0.0, 0.0, 1.0], 3.0, 0.9).unwrap();

        let result = IndexingResult::new("x", vector, row);
        let out = result.to_row();
        assert_eq!(out[columns::DIRECTION], Value::F32List(vec![0.0, 0.0, 1.0]));
        assert_eq!(out[columns::STRENGTH], Value::Float(3.0));
        assert_eq!(out[columns::CONSISTENCY], Value::Float(0.9));
    }

    // ------------------------------------------------------------------------
    // RetrievalResult tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_retrieval_result_rejects_non_finite_score() {
        assert!(RetrievalResult::new("1", f64::NAN, Row::new()).is_err());
    }

    #[test]
    fn test_retrieval_result_from_row() {
        let mut row = Row::new();
        row.insert(columns::VERSION_ID.into(), Value::Int(123));
        let result = RetrievalResult::from_row(row, 0.5, columns::VERSION_ID).unwrap();
        assert_eq!(result.key, "123");
        assert_eq!(result.get(columns::VERSION_ID), Some(&Value::Int(123)));
        assert!(result.rank.is_none());
    }

    #[test]
    fn test_retrieval_result_from_row_missing_key() {
        let err = RetrievalResult::from_row(Row::new(), 0.5, columns::VERSION_ID).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_retrieval_result_with_rank() {
        let result = RetrievalResult::new("1", 0.5, Row::new()).unwrap();
        assert!(result.clone().with_rank(0).is_err());
        assert_eq!(result.with_rank(1).unwrap().rank, Some(1));
    }

    #[test]
    fn test_retrieval_result_to_json() {
        let result = RetrievalResult::new("9", 0.25, Row::new())
            .unwrap()
            .with_rank(2)
            .unwrap()
            .with_vector(unit_x())
            .with_meta("query_dim", serde_json::json!(3));

        let json = result.to_json();
        assert_eq!(json["key"], "9");
        assert_eq!(json["rank"], 2);
        assert_eq!(json["vector"]["strength"], 1.0);
        assert_eq!(json["meta"]["query_dim"], 3);
    }
}
