//! The record store.
//!
//! [`RecordStore`] owns a keyed [`Table`], enforces a [`StoreSchema`] on
//! every write, and persists to a single Parquet snapshot.
//!
//! ```rust,ignore
//! use loradex_store::RecordStore;
//!
//! let mut store = RecordStore::default();
//! store.upsert(record.to_row())?;
//! store.save(Some(Path::new("db/loradex.parquet")))?;
//!
//! let store = RecordStore::load("db/loradex.parquet")?;
//! let hit = store.get(123)?;
//! ```

use crate::codec;
use crate::schema::{self, StoreSchema};
use crate::snapshot;
use crate::stats::{MetricSummary, StoreStats};
use crate::table::Table;
use loradex_core::{
    AdapterRecord, Error, FingerprintVector, IndexingResult, Result, Row, Value,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// StoredRecord
// ============================================================================

/// One record read back from the store.
///
/// `row` carries every column; its vector cell is decoded to single
/// precision. `vector` is set when the direction and both metrics are present.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Value of the key column.
    pub key: i64,
    /// Every stored column, vector cell decoded to `f32`.
    pub row: Row,
    /// Decoded fingerprint, when direction and both metrics are present.
    pub vector: Option<FingerprintVector>,
}

impl StoredRecord {
    /// The record's fingerprint, or a validation error if it is incomplete.
    pub fn fingerprint(&self) -> Result<&FingerprintVector> {
        self.vector.as_ref().ok_or_else(|| {
            Error::validation(format!(
                "record {} has no complete fingerprint (direction, strength, consistency)",
                self.key
            ))
        })
    }

    /// Convenience access to a row field.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }
}

// ============================================================================
// RecordStore
// ============================================================================

/// Schema-enforced, key-addressed fingerprint table.
#[derive(Debug, Clone)]
pub struct RecordStore {
    schema: StoreSchema,
    table: Table,
    path: Option<PathBuf>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(StoreSchema::default())
    }
}

impl RecordStore {
    /// Create an empty store with every required column present.
    pub fn new(schema: StoreSchema) -> Self {
        let mut table = Table::with_key_column(schema.key_column());
        for column in schema.required_columns() {
            table.ensure_column(column);
        }
        Self {
            schema,
            table,
            path: None,
        }
    }

    /// Wrap an existing table, backfilling missing required columns.
    ///
    /// Duplicate keys are accepted here; they surface as
    /// [`Error::Corruption`] when that key is upserted or read.
    pub fn from_table(mut table: Table, schema: StoreSchema) -> Result<Self> {
        table.ensure_column(schema.key_column());
        for column in schema.required_columns() {
            table.ensure_column(column);
        }
        table.set_key_column(schema.key_column())?;

        let dups = table.duplicate_keys();
        if !dups.is_empty() {
            log::warn!(
                "Table has {} duplicated {} value(s): {:?}",
                dups.len(),
                schema.key_column(),
                dups.iter().map(|(k, _)| k).collect::<Vec<_>>()
            );
        }

        Ok(Self {
            schema,
            table,
            path: None,
        })
    }

    /// Load a snapshot with the default schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_schema(path, StoreSchema::default())
    }

    /// Load a snapshot, enforcing `schema` on later writes.
    pub fn load_with_schema(path: impl AsRef<Path>, schema: StoreSchema) -> Result<Self> {
        let path = path.as_ref();
        let table = snapshot::read_table(path)?;
        let mut store = Self::from_table(table, schema)?;
        store.path = Some(path.to_path_buf());
        log::info!("Loaded {} records from {}", store.len(), path.display());
        Ok(store)
    }

    /// Persist to `path`, or to the remembered path when `None`.
    ///
    /// The path used is remembered for later saves.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let out = match path {
            Some(p) => p.to_path_buf(),
            None => self.path.clone().ok_or_else(|| {
                Error::validation("No output path provided and the store has no remembered path")
            })?,
        };
        snapshot::write_table(&self.table, &out)?;
        log::info!("Saved {} records to {}", self.len(), out.display());
        self.path = Some(out.clone());
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Insert or fully replace the row with this row's key.
    ///
    /// On error the store is unchanged.
    pub fn upsert(&mut self, row: Row) -> Result<()> {
        let (key, row) = self.schema.coerce_row(row)?;

        let hits = self.table.rows_for_key(key).to_vec();
        match hits.as_slice() {
            [] => {
                self.table.append_row(row)?;
                log::debug!("Inserted {}={key}", self.schema.key_column());
            }
            &[idx] => {
                self.table.overwrite_row(idx, row)?;
                log::debug!("Updated {}={key}", self.schema.key_column());
            }
            rows => {
                return Err(Error::corruption(
                    self.schema.key_column(),
                    key,
                    rows.len(),
                ));
            }
        }
        Ok(())
    }

    /// Upsert a typed record.
    pub fn upsert_record(&mut self, record: &AdapterRecord) -> Result<()> {
        self.upsert(record.to_row())
    }

    /// Upsert an indexing result; its fingerprint overrides any vector columns in its row.
    pub fn upsert_indexing_result(&mut self, result: &IndexingResult) -> Result<()> {
        log::debug!("Storing indexing result for adapter {}", result.adapter_id);
        self.upsert(result.to_row())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Fetch the record with `key`.
    pub fn get(&self, key: i64) -> Result<StoredRecord> {
        match self.table.rows_for_key(key) {
            [] => Err(Error::not_found(format!(
                "no row found where {}={key}",
                self.schema.key_column()
            ))),
            &[idx] => self.read_record(idx),
            rows => Err(Error::corruption(
                self.schema.key_column(),
                key,
                rows.len(),
            )),
        }
    }

    /// Fetch the first record whose `column` equals `value`.
    ///
    /// Lookups on the key column behave like [`RecordStore::get`].
    pub fn get_by(&self, column: &str, value: impl Into<Value>) -> Result<StoredRecord> {
        let value = value.into();
        if column == self.schema.key_column() {
            let key = schema::coerce_key(value, column)?;
            return self.get(key);
        }
        let rows = self.table.find_rows(column, &value)?;
        match rows.first() {
            Some(&idx) => self.read_record(idx),
            None => Err(Error::not_found(format!(
                "no row found where {column}={value}"
            ))),
        }
    }

    /// Every record in insertion order, with its fingerprint decoded.
    ///
    /// Rows without a complete, valid fingerprint yield an error.
    pub fn iter(&self) -> impl Iterator<Item = Result<StoredRecord>> + '_ {
        (0..self.table.num_rows()).map(|idx| {
            let record = self.read_record(idx)?;
            record.fingerprint()?;
            Ok(record)
        })
    }

    fn read_record(&self, idx: usize) -> Result<StoredRecord> {
        let mut row = self.table.row(idx);

        let key_column = self.schema.key_column();
        let key = row
            .get(key_column)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::type_coercion(format!("row {idx} has no {key_column}")))?;

        let vector_column = self.schema.vector_column();
        let direction = match row.get(vector_column) {
            Some(cell) if !cell.is_null() => Some(codec::decode_value(cell)?),
            _ => None,
        };
        if let Some(direction) = &direction {
            row.insert(vector_column.to_string(), Value::F32List(direction.clone()));
        }

        let strength = row.get(self.schema.strength_column()).and_then(Value::as_f64);
        let consistency = row
            .get(self.schema.consistency_column())
            .and_then(Value::as_f64);

        let vector = match (direction, strength, consistency) {
            (Some(d), Some(s), Some(c)) => Some(FingerprintVector::new(d, s, c)?),
            _ => None,
        };

        Ok(StoredRecord { key, row, vector })
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in table order.
    pub fn columns(&self) -> Vec<&str> {
        self.table.column_names()
    }

    /// Schema the store enforces on upsert.
    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    /// Remembered snapshot path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Underlying columnar table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Summary statistics over the stored records.
    pub fn stats(&self) -> StoreStats {
        let mut dimensions = BTreeMap::new();
        let mut strengths = Vec::new();
        let mut consistencies = Vec::new();

        for record in self.iter() {
            let Ok(record) = record else { continue };
            let Some(vector) = record.vector else { continue };
            *dimensions.entry(vector.dim()).or_insert(0) += 1;
            strengths.push(vector.strength());
            consistencies.push(vector.consistency());
        }

        StoreStats {
            records: self.len(),
            valid: strengths.len(),
            dimensions,
            strength: MetricSummary::from_values(strengths),
            consistency: MetricSummary::from_values(consistencies),
            duplicate_keys: self
                .table
                .duplicate_keys()
                .into_iter()
                .map(|(k, _)| k)
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};
    use loradex_core::columns;
    use tempfile::tempdir;

    fn fingerprint(direction: Vec<f32>, strength: f64, consistency: f64) -> FingerprintVector {
        FingerprintVector::new(direction, strength, consistency).unwrap()
    }

    fn record(key: i64, name: &str) -> AdapterRecord {
        AdapterRecord::new(key, fingerprint(vec![1.0, 0.0, 0.0], 1.0, 0.5)).with_model_name(name)
    }

    fn corrupt_store() -> RecordStore {
        let table = Table::from_columns(vec![
            Column::new(
                columns::VERSION_ID,
                ColumnData::Int64(vec![Some(7), Some(7)]),
            ),
            Column::new(
                columns::MODEL_NAME,
                ColumnData::Utf8(vec![Some("a".into()), Some("b".into())]),
            ),
        ])
        .unwrap();
        RecordStore::from_table(table, StoreSchema::default()).unwrap()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_new_has_required_columns() {
        let store = RecordStore::default();
        assert!(store.is_empty());
        assert_eq!(store.columns(), columns::DEFAULT_REQUIRED.to_vec());
        assert!(store.path().is_none());
    }

    #[test]
    fn test_from_table_backfills() {
        let table = Table::from_columns(vec![Column::new(
            columns::VERSION_ID,
            ColumnData::Int64(vec![Some(1)]),
        )])
        .unwrap();
        let store = RecordStore::from_table(table, StoreSchema::default()).unwrap();

        for column in columns::DEFAULT_REQUIRED {
            assert!(store.columns().contains(&column), "missing {column}");
        }
        let hit = store.get(1).unwrap();
        assert_eq!(hit.get(columns::MODEL_NAME), Some(&Value::Null));
        assert!(hit.vector.is_none());
    }

    // ------------------------------------------------------------------------
    // Upsert
    // ------------------------------------------------------------------------

    #[test]
    fn test_upsert_insert_then_update() {
        let mut store = RecordStore::default();
        store.upsert_record(&record(1, "first")).unwrap();
        store.upsert_record(&record(1, "second")).unwrap();

        assert_eq!(store.len(), 1);
        let hit = store.get(1).unwrap();
        assert_eq!(hit.get(columns::MODEL_NAME), Some(&Value::Str("second".into())));
    }

    #[test]
    fn test_upsert_full_overwrite_clears_extras() {
        let mut store = RecordStore::default();
        store
            .upsert_record(&record(1, "a").with_extra("trigger", "pixel"))
            .unwrap();
        store.upsert_record(&record(1, "a")).unwrap();

        let hit = store.get(1).unwrap();
        assert_eq!(hit.get("trigger"), Some(&Value::Null));
    }

    #[test]
    fn test_upsert_missing_required_column() {
        let mut store = RecordStore::default();
        let mut row = record(1, "a").to_row();
        row.remove(columns::FOLDER_NAME);

        let err = store.upsert(row).unwrap_err();
        assert!(matches!(err, Error::Schema { ref column } if column == "folder_name"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upsert_string_key_is_coerced() {
        let mut store = RecordStore::default();
        let mut row = record(0, "a").to_row();
        row.insert(columns::VERSION_ID.into(), Value::Str("42".into()));
        store.upsert(row).unwrap();
        assert_eq!(store.get(42).unwrap().key, 42);
    }

    #[test]
    fn test_upsert_blank_optional_int_is_absent() {
        let mut store = RecordStore::default();
        let mut row = record(1, "a").to_row();
        row.insert(columns::MODEL_ID.into(), Value::Str(" ".into()));
        row.insert(columns::MODEL_DOWNLOAD_COUNT.into(), Value::Float(f64::NAN));
        row.insert(columns::MODEL_NSFW_LEVEL.into(), Value::Str("3".into()));
        store.upsert(row).unwrap();

        let hit = store.get(1).unwrap();
        assert_eq!(hit.get(columns::MODEL_ID), Some(&Value::Null));
        assert_eq!(hit.get(columns::MODEL_DOWNLOAD_COUNT), Some(&Value::Null));
        assert_eq!(hit.get(columns::MODEL_NSFW_LEVEL), Some(&Value::Int(3)));
    }

    #[test]
    fn test_upsert_failure_leaves_store_unchanged() {
        let mut store = RecordStore::default();
        store.upsert_record(&record(1, "a")).unwrap();

        let mut row = record(1, "b").to_row();
        row.insert(columns::STRENGTH.into(), Value::Str("very".into()));
        assert!(store.upsert(row).is_err());

        let mut row = record(2, "b").to_row();
        row.insert(columns::DIRECTION.into(), Value::F32List(vec![]));
        assert!(store.upsert(row).unwrap_err().is_validation());

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(1).unwrap().get(columns::MODEL_NAME),
            Some(&Value::Str("a".into()))
        );
    }

    #[test]
    fn test_upsert_rejects_non_finite_metric() {
        let mut store = RecordStore::default();
        let mut row = record(1, "a").to_row();
        row.insert(columns::CONSISTENCY.into(), Value::Float(f64::NEG_INFINITY));
        assert!(store.upsert(row).unwrap_err().is_validation());
    }

    #[test]
    fn test_upsert_indexing_result() {
        let mut store = RecordStore::default();
        let mut row = record(5, "a").to_row();
        row.insert(columns::STRENGTH.into(), Value::Float(100.0));
        let result = IndexingResult::new("5", fingerprint(vec![0.0, 1.0], 2.0, 0.25), row);

        store.upsert_indexing_result(&result).unwrap();
        let vector = store.get(5).unwrap().vector.unwrap();
        assert_eq!(vector.direction(), &[0.0, 1.0]);
        assert_eq!(vector.strength(), 2.0);
    }

    // ------------------------------------------------------------------------
    // Corruption
    // ------------------------------------------------------------------------

    #[test]
    fn test_upsert_on_duplicated_key_is_corruption() {
        let mut store = corrupt_store();
        let err = store.upsert_record(&record(7, "c")).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("multiple rows"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_on_duplicated_key_is_corruption() {
        let store = corrupt_store();
        assert!(store.get(7).unwrap_err().is_corruption());
        assert!(store.get_by(columns::VERSION_ID, 7i64).unwrap_err().is_corruption());
        assert_eq!(store.stats().duplicate_keys, vec![7]);
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    #[test]
    fn test_get_not_found() {
        let store = RecordStore::default();
        let err = store.get(99).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("version_id=99"));
    }

    #[test]
    fn test_get_by_unknown_column() {
        let store = RecordStore::default();
        let err = store.get_by("nope", 1i64).unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(_)));
    }

    #[test]
    fn test_get_by_non_key_column_returns_first_match() {
        let mut store = RecordStore::default();
        store.upsert_record(&record(1, "same")).unwrap();
        store.upsert_record(&record(2, "same")).unwrap();

        let hit = store.get_by(columns::MODEL_NAME, "same").unwrap();
        assert_eq!(hit.key, 1);
        assert!(store.get_by(columns::MODEL_NAME, "other").unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_by_key_column_accepts_string() {
        let mut store = RecordStore::default();
        store.upsert_record(&record(3, "a")).unwrap();
        assert_eq!(store.get_by(columns::VERSION_ID, "3").unwrap().key, 3);
    }

    #[test]
    fn test_get_decodes_vector() {
        let mut store = RecordStore::default();
        store.upsert_record(&record(1, "a")).unwrap();
        let hit = store.get(1).unwrap();
        assert_eq!(
            hit.get(columns::DIRECTION),
            Some(&Value::F32List(vec![1.0, 0.0, 0.0]))
        );
        assert_eq!(hit.fingerprint().unwrap().consistency(), 0.5);
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let mut store = RecordStore::default();
        for key in [3, 1, 2] {
            store.upsert_record(&record(key, "x")).unwrap();
        }
        let keys: Vec<i64> = store.iter().map(|r| r.unwrap().key).collect();
        assert_eq!(keys, vec![3, 1, 2]);
    }

    #[test]
    fn test_iter_errors_on_incomplete_fingerprint() {
        let mut store = RecordStore::default();
        let mut row = record(1, "a").to_row();
        row.insert(columns::STRENGTH.into(), Value::Null);
        store.upsert(row).unwrap();

        let results: Vec<_> = store.iter().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].as_ref().unwrap_err().is_validation());
        assert_eq!(store.stats().invalid(), 1);
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    #[test]
    fn test_save_without_path_fails() {
        let mut store = RecordStore::default();
        assert!(store.save(None).unwrap_err().is_validation());
    }

    #[test]
    fn test_save_remembers_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.parquet");

        let mut store = RecordStore::default();
        store.upsert_record(&record(1, "a")).unwrap();
        assert_eq!(store.save(Some(&path)).unwrap(), path);
        assert_eq!(store.path(), Some(path.as_path()));

        store.upsert_record(&record(2, "b")).unwrap();
        store.save(None).unwrap();
        assert_eq!(RecordStore::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_load_round_trip_is_bit_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.parquet");
        let direction = vec![0.1f32, -0.2, 1.0e-7, 3.4e38];

        let mut store = RecordStore::default();
        store
            .upsert_record(&AdapterRecord::new(9, fingerprint(direction.clone(), 2.5, 0.1)))
            .unwrap();
        store.save(Some(&path)).unwrap();

        let loaded = RecordStore::load(&path).unwrap();
        let vector = loaded.get(9).unwrap().vector.unwrap();
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(vector.direction()), bits(&direction));
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    // ------------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------------

    #[test]
    fn test_stats() {
        let mut store = RecordStore::default();
        store
            .upsert_record(&AdapterRecord::new(1, fingerprint(vec![1.0, 0.0], 1.0, 0.2)))
            .unwrap();
        store
            .upsert_record(&AdapterRecord::new(2, fingerprint(vec![1.0, 0.0, 0.0], 3.0, 0.4)))
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.dimensions.get(&2), Some(&1));
        assert_eq!(stats.dimensions.get(&3), Some(&1));
        let strength = stats.strength.unwrap();
        assert_eq!(strength.min, 1.0);
        assert_eq!(strength.max, 3.0);
        assert_eq!(strength.mean, 2.0);
    }
}
