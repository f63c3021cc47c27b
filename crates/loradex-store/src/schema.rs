//! Record schema and canonical type coercion.
//!
//! A [`StoreSchema`] names the key column, the ordered set of columns every
//! row must carry, and which of those get integer, metric, or vector
//! coercion on upsert. Columns outside the schema are stored opaquely.

use crate::codec;
use loradex_core::{Error, Result, Row, Value, columns};

/// Schema enforced by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSchema {
    key_column: String,
    required_columns: Vec<String>,
    integer_columns: Vec<String>,
    metric_columns: Vec<String>,
    vector_column: String,
}

impl Default for StoreSchema {
    fn default() -> Self {
        Self {
            key_column: columns::VERSION_ID.to_string(),
            required_columns: columns::DEFAULT_REQUIRED.iter().map(|c| c.to_string()).collect(),
            integer_columns: vec![
                columns::MODEL_ID.to_string(),
                columns::MODEL_DOWNLOAD_COUNT.to_string(),
                columns::MODEL_NSFW_LEVEL.to_string(),
            ],
            metric_columns: vec![
                columns::STRENGTH.to_string(),
                columns::CONSISTENCY.to_string(),
            ],
            vector_column: columns::DIRECTION.to_string(),
        }
    }
}

impl StoreSchema {
    /// Set the key column.
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    /// Replace the ordered required-column set.
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the set of integer-coerced metadata columns.
    pub fn with_integer_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.integer_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Key column name.
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Required columns, in snapshot order.
    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    /// Vector column name.
    pub fn vector_column(&self) -> &str {
        &self.vector_column
    }

    /// Strength column name.
    pub fn strength_column(&self) -> &str {
        &self.metric_columns[0]
    }

    /// Consistency column name.
    pub fn consistency_column(&self) -> &str {
        &self.metric_columns[1]
    }

    /// Check presence of the key and every required column.
    pub fn check_presence(&self, row: &Row) -> Result<()> {
        if !row.contains_key(&self.key_column) {
            return Err(Error::schema(&self.key_column));
        }
        match self.required_columns.iter().find(|c| !row.contains_key(*c)) {
            Some(missing) => Err(Error::schema(missing)),
            None => Ok(()),
        }
    }

    /// Validate and coerce a row to canonical types.
    ///
    /// Returns the canonical row and its key.
    pub fn coerce_row(&self, row: Row) -> Result<(i64, Row)> {
        self.check_presence(&row)?;

        let mut out = Row::new();
        let mut key = None;
        for (column, value) in row {
            let value = if column == self.key_column {
                let k = coerce_key(value, &column)?;
                key = Some(k);
                Value::Int(k)
            } else if self.integer_columns.contains(&column) {
                coerce_optional_int(value, &column)?
            } else if self.metric_columns.contains(&column) {
                coerce_metric(value, &column)?
            } else if column == self.vector_column {
                codec::encode_value(value)?
            } else {
                value
            };
            out.insert(column, value);
        }

        // Presence was checked above, so the key was visited.
        let key = key.ok_or_else(|| Error::schema(&self.key_column))?;
        Ok((key, out))
    }
}

/// Coerce the key cell; the key may never be absent.
pub fn coerce_key(value: Value, column: &str) -> Result<i64> {
    match coerce_optional_int(value, column)? {
        Value::Int(k) => Ok(k),
        _ => Err(Error::type_coercion(format!(
            "{column} cannot be absent or blank"
        ))),
    }
}

/// Coerce to `Int`, or `Null` for absent/blank/NaN input.
pub fn coerce_optional_int(value: Value, column: &str) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => Ok(Value::Int(v)),
        Value::Float(f) if f.is_nan() => Ok(Value::Null),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Ok(Value::Int(f as i64))
        }
        Value::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            trimmed.parse::<i64>().map(Value::Int).map_err(|_| {
                Error::type_coercion(format!("could not coerce {column}={s:?} to int"))
            })
        }
        other => Err(Error::type_coercion(format!(
            "could not coerce {column}={other} ({}) to int",
            other.type_name()
        ))),
    }
}

/// Coerce to `Float`; absent stays absent, non-finite numbers are rejected.
pub fn coerce_metric(value: Value, column: &str) -> Result<Value> {
    let f = match value {
        Value::Null => return Ok(Value::Null),
        Value::Int(v) => v as f64,
        Value::Float(f) => f,
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
            Error::type_coercion(format!("could not coerce {column}={s:?} to float"))
        })?,
        other => {
            return Err(Error::type_coercion(format!(
                "could not coerce {column} ({}) to float",
                other.type_name()
            )));
        }
    };
    if !f.is_finite() {
        return Err(Error::validation(format!(
            "{column} must be finite, got {f}"
        )));
    }
    Ok(Value::Float(f))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row(key: Value) -> Row {
        let mut row = Row::new();
        for column in columns::DEFAULT_REQUIRED {
            row.insert(column.to_string(), Value::Null);
        }
        row.insert(columns::VERSION_ID.into(), key);
        row.insert(columns::DIRECTION.into(), Value::F32List(vec![1.0, 0.0, 0.0]));
        row.insert(columns::STRENGTH.into(), Value::Float(1.0));
        row.insert(columns::CONSISTENCY.into(), Value::Int(1));
        row
    }

    #[test]
    fn test_default_schema() {
        let schema = StoreSchema::default();
        assert_eq!(schema.key_column(), "version_id");
        assert_eq!(schema.required_columns().len(), 10);
        assert_eq!(schema.vector_column(), "direction");
        assert_eq!(schema.strength_column(), "strength");
        assert_eq!(schema.consistency_column(), "consistency");
    }

    #[test]
    fn test_check_presence_missing_key() {
        let schema = StoreSchema::default();
        let mut row = full_row(Value::Int(1));
        row.remove(columns::VERSION_ID);
        let err = schema.check_presence(&row).unwrap_err();
        assert!(matches!(err, Error::Schema { ref column } if column == "version_id"));
    }

    #[test]
    fn test_check_presence_missing_required() {
        let schema = StoreSchema::default();
        let mut row = full_row(Value::Int(1));
        row.remove(columns::MODEL_NSFW_LEVEL);
        let err = schema.check_presence(&row).unwrap_err();
        assert!(err.to_string().contains("model_nsfw_level"));
    }

    #[test]
    fn test_coerce_row_string_key() {
        let schema = StoreSchema::default();
        let (key, row) = schema.coerce_row(full_row(Value::Str(" 123 ".into()))).unwrap();
        assert_eq!(key, 123);
        assert_eq!(row[columns::VERSION_ID], Value::Int(123));
        assert_eq!(row[columns::DIRECTION], Value::F64List(vec![1.0, 0.0, 0.0]));
        assert_eq!(row[columns::CONSISTENCY], Value::Float(1.0));
    }

    #[test]
    fn test_coerce_row_blank_key_rejected() {
        let schema = StoreSchema::default();
        let err = schema.coerce_row(full_row(Value::Str("  ".into()))).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion(_)));
        let err = schema.coerce_row(full_row(Value::Null)).unwrap_err();
        assert!(matches!(err, Error::TypeCoercion(_)));
    }

    #[test]
    fn test_coerce_optional_int() {
        assert_eq!(coerce_optional_int(Value::Str("".into()), "c").unwrap(), Value::Null);
        assert_eq!(coerce_optional_int(Value::Float(f64::NAN), "c").unwrap(), Value::Null);
        assert_eq!(coerce_optional_int(Value::Float(4.0), "c").unwrap(), Value::Int(4));
        assert_eq!(coerce_optional_int(Value::Str("42".into()), "c").unwrap(), Value::Int(42));
        assert!(coerce_optional_int(Value::Float(4.5), "c").is_err());
        assert!(coerce_optional_int(Value::Str("abc".into()), "c").is_err());
        assert!(coerce_optional_int(Value::F32List(vec![1.0]), "c").is_err());
    }

    #[test]
    fn test_coerce_metric() {
        assert_eq!(coerce_metric(Value::Null, "strength").unwrap(), Value::Null);
        assert_eq!(coerce_metric(Value::Int(2), "strength").unwrap(), Value::Float(2.0));
        assert_eq!(
            coerce_metric(Value::Str("0.5".into()), "strength").unwrap(),
            Value::Float(0.5)
        );
        assert!(matches!(
            coerce_metric(Value::Str("high".into()), "strength").unwrap_err(),
            Error::TypeCoercion(_)
        ));
        assert!(
            coerce_metric(Value::Float(f64::INFINITY), "strength")
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_coerce_row_keeps_extras_opaque() {
        let schema = StoreSchema::default();
        let mut row = full_row(Value::Int(1));
        row.insert("trigger".into(), Value::Str("007".into()));
        let (_, row) = schema.coerce_row(row).unwrap();
        assert_eq!(row["trigger"], Value::Str("007".into()));
    }

    #[test]
    fn test_custom_key_column() {
        let schema = StoreSchema::default()
            .with_key_column("adapter_id")
            .with_required_columns(["adapter_id", "direction", "strength", "consistency"]);
        let mut row = Row::new();
        row.insert("adapter_id".into(), Value::Int(9));
        row.insert("direction".into(), Value::F32List(vec![1.0]));
        row.insert("strength".into(), Value::Float(1.0));
        row.insert("consistency".into(), Value::Float(1.0));
        let (key, _) = schema.coerce_row(row).unwrap();
        assert_eq!(key, 9);
    }
}
