//! Columnar table with a key index.
//!
//! Columns are homogeneous and share one row count. An optional key column
//! is indexed (`key → row indices`); the index keeps every row per key so a
//! duplicated key stays visible to callers instead of being silently
//! collapsed.

use loradex_core::{Error, Result, Row, Value};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// ColumnKind / ColumnData
// ============================================================================

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every cell absent; typed by the first non-absent value written.
    Null,
    /// 64-bit integers.
    Int64,
    /// Double-precision floats.
    Float64,
    /// UTF-8 strings.
    Utf8,
    /// Flat `f64` sequences.
    FloatList,
}

impl ColumnKind {
    /// Kind a value would create, or `None` for the absent marker.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(_) => Some(Self::Int64),
            Value::Float(_) => Some(Self::Float64),
            Value::Str(_) => Some(Self::Utf8),
            Value::F32List(_) | Value::F64List(_) => Some(Self::FloatList),
        }
    }

    /// Kind a column must have to hold both `self` and `incoming` values.
    ///
    /// Integers widen into floats; everything else must match exactly.
    pub fn unify(self, incoming: Self) -> Option<Self> {
        use ColumnKind::*;
        match (self, incoming) {
            (Null, k) | (k, Null) => Some(k),
            (Int64, Float64) | (Float64, Int64) => Some(Float64),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Null => "null",
            ColumnKind::Int64 => "int64",
            ColumnKind::Float64 => "float64",
            ColumnKind::Utf8 => "utf8",
            ColumnKind::FloatList => "list<float64>",
        };
        f.write_str(name)
    }
}

/// Cell storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// All-absent column of the given length.
    Null(usize),
    /// Integer cells.
    Int64(Vec<Option<i64>>),
    /// Float cells.
    Float64(Vec<Option<f64>>),
    /// String cells.
    Utf8(Vec<Option<String>>),
    /// Flat float-sequence cells.
    FloatList(Vec<Option<Vec<f64>>>),
}

impl ColumnData {
    /// An all-absent column of `kind` with `len` rows.
    pub fn nulls(kind: ColumnKind, len: usize) -> Self {
        match kind {
            ColumnKind::Null => Self::Null(len),
            ColumnKind::Int64 => Self::Int64(vec![None; len]),
            ColumnKind::Float64 => Self::Float64(vec![None; len]),
            ColumnKind::Utf8 => Self::Utf8(vec![None; len]),
            ColumnKind::FloatList => Self::FloatList(vec![None; len]),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            Self::Null(n) => *n,
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
            Self::FloatList(v) => v.len(),
        }
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical kind.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Null(_) => ColumnKind::Null,
            Self::Int64(_) => ColumnKind::Int64,
            Self::Float64(_) => ColumnKind::Float64,
            Self::Utf8(_) => ColumnKind::Utf8,
            Self::FloatList(_) => ColumnKind::FloatList,
        }
    }

    /// Cell at `idx` as a [`Value`]; out of range reads as absent.
    pub fn get(&self, idx: usize) -> Value {
        match self {
            Self::Null(_) => Value::Null,
            Self::Int64(v) => v.get(idx).copied().flatten().into(),
            Self::Float64(v) => v.get(idx).copied().flatten().into(),
            Self::Utf8(v) => v.get(idx).cloned().flatten().into(),
            Self::FloatList(v) => v.get(idx).cloned().flatten().into(),
        }
    }

    /// Whether the cell at `idx` equals `value`.
    ///
    /// Integers and floats compare numerically.
    pub fn cell_eq(&self, idx: usize, value: &Value) -> bool {
        match (self.get(idx), value) {
            (Value::Int(a), Value::Float(b)) => (a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => a == (*b as f64),
            (cell, value) => cell == *value,
        }
    }

    /// Convert in place to a wider kind (see [`ColumnKind::unify`]).
    fn promote(&mut self, kind: ColumnKind) -> Result<()> {
        if self.kind() == kind {
            return Ok(());
        }
        let promoted = match (&*self, kind) {
            (Self::Null(n), k) => Self::nulls(k, *n),
            (Self::Int64(v), ColumnKind::Float64) => {
                Self::Float64(v.iter().map(|c| c.map(|x| x as f64)).collect())
            }
            (data, k) => {
                return Err(Error::type_coercion(format!(
                    "cannot convert {} column to {k}",
                    data.kind()
                )));
            }
        };
        *self = promoted;
        Ok(())
    }

    /// Append a cell. The column must already have a compatible kind.
    fn push(&mut self, value: Value) -> Result<()> {
        match (self, value) {
            (Self::Null(n), Value::Null) => *n += 1,
            (Self::Int64(v), Value::Null) => v.push(None),
            (Self::Int64(v), Value::Int(x)) => v.push(Some(x)),
            (Self::Float64(v), Value::Null) => v.push(None),
            (Self::Float64(v), Value::Float(x)) => v.push(Some(x)),
            (Self::Float64(v), Value::Int(x)) => v.push(Some(x as f64)),
            (Self::Utf8(v), Value::Null) => v.push(None),
            (Self::Utf8(v), Value::Str(s)) => v.push(Some(s)),
            (Self::FloatList(v), Value::Null) => v.push(None),
            (Self::FloatList(v), Value::F64List(x)) => v.push(Some(x)),
            (Self::FloatList(v), Value::F32List(x)) => {
                v.push(Some(x.into_iter().map(f64::from).collect()))
            }
            (data, value) => return Err(mismatch(data.kind(), &value)),
        }
        Ok(())
    }

    /// Overwrite the cell at `idx`. The column must already have a compatible kind.
    fn set(&mut self, idx: usize, value: Value) -> Result<()> {
        if idx >= self.len() {
            return Err(Error::validation(format!(
                "row index {idx} out of range ({} rows)",
                self.len()
            )));
        }
        match (self, value) {
            (Self::Null(_), Value::Null) => {}
            (Self::Int64(v), Value::Null) => v[idx] = None,
            (Self::Int64(v), Value::Int(x)) => v[idx] = Some(x),
            (Self::Float64(v), Value::Null) => v[idx] = None,
            (Self::Float64(v), Value::Float(x)) => v[idx] = Some(x),
            (Self::Float64(v), Value::Int(x)) => v[idx] = Some(x as f64),
            (Self::Utf8(v), Value::Null) => v[idx] = None,
            (Self::Utf8(v), Value::Str(s)) => v[idx] = Some(s),
            (Self::FloatList(v), Value::Null) => v[idx] = None,
            (Self::FloatList(v), Value::F64List(x)) => v[idx] = Some(x),
            (Self::FloatList(v), Value::F32List(x)) => {
                v[idx] = Some(x.into_iter().map(f64::from).collect())
            }
            (data, value) => return Err(mismatch(data.kind(), &value)),
        }
        Ok(())
    }
}

fn mismatch(kind: ColumnKind, value: &Value) -> Error {
    Error::type_coercion(format!(
        "cannot store {} value in {kind} column",
        value.type_name()
    ))
}

// ============================================================================
// Column / Table
// ============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell storage.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }
}

/// An ordered set of equal-length columns with an optional key index.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
    key_column: Option<String>,
    index: HashMap<i64, Vec<usize>>,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table whose only column is an empty, indexed key column.
    pub fn with_key_column(column: &str) -> Self {
        Self {
            columns: vec![Column::new(column, ColumnData::Null(0))],
            num_rows: 0,
            key_column: Some(column.to_string()),
            index: HashMap::new(),
        }
    }

    /// Build a table from columns; all columns must have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    ///
    /// The first column of an empty table sets the row count.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(Error::validation(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if self.columns.is_empty() {
            self.num_rows = column.data.len();
        } else if column.data.len() != self.num_rows {
            return Err(Error::validation(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.data.len(),
                self.num_rows
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append an all-absent column if `name` is missing.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns
                .push(Column::new(name, ColumnData::Null(self.num_rows)));
        }
    }

    /// Index `column` as the key column, rebuilding the index.
    ///
    /// The column must exist and hold integers (or be all absent).
    pub fn set_key_column(&mut self, column: &str) -> Result<()> {
        let data = self
            .column(column)
            .ok_or_else(|| Error::unknown_column(column))?
            .data();

        let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
        match data {
            ColumnData::Null(_) => {}
            ColumnData::Int64(cells) => {
                for (i, cell) in cells.iter().enumerate() {
                    if let Some(k) = cell {
                        index.entry(*k).or_default().push(i);
                    }
                }
            }
            other => {
                return Err(Error::format(format!(
                    "key column '{column}' must be int64, found {}",
                    other.kind()
                )));
            }
        }
        self.index = index;
        self.key_column = Some(column.to_string());
        Ok(())
    }

    /// Indexed key column, if any.
    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// All columns, in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Whether `name` is a column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row indices holding `key`, in insertion order.
    pub fn rows_for_key(&self, key: i64) -> &[usize] {
        self.index.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys held by more than one row, with their row counts.
    pub fn duplicate_keys(&self) -> Vec<(i64, usize)> {
        let mut dups: Vec<_> = self
            .index
            .iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(k, rows)| (*k, rows.len()))
            .collect();
        dups.sort_unstable();
        dups
    }

    /// Indices of rows whose `column` cell equals `value`, in insertion order.
    pub fn find_rows(&self, column: &str, value: &Value) -> Result<Vec<usize>> {
        let data = self
            .column(column)
            .ok_or_else(|| Error::unknown_column(column))?
            .data();
        Ok((0..self.num_rows)
            .filter(|&i| data.cell_eq(i, value))
            .collect())
    }

    /// Cell at (`idx`, `column`); unknown columns read as absent.
    pub fn value(&self, idx: usize, column: &str) -> Value {
        self.column(column)
            .map(|c| c.data.get(idx))
            .unwrap_or(Value::Null)
    }

    /// Row `idx` as a map over every column.
    pub fn row(&self, idx: usize) -> Row {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.data.get(idx)))
            .collect()
    }

    /// Append a row; columns the table lacks are created.
    ///
    /// On error the table is unchanged.
    pub fn append_row(&mut self, row: Row) -> Result<usize> {
        let kinds = self.plan(&row)?;
        self.apply_kinds(kinds)?;

        let idx = self.num_rows;
        let mut row = row;
        for column in &mut self.columns {
            let value = row.remove(&column.name).unwrap_or(Value::Null);
            column.data.push(value)?;
        }
        self.num_rows += 1;
        self.index_row(idx);
        Ok(idx)
    }

    /// Replace every cell of row `idx`; columns missing from `row` become absent.
    ///
    /// On error the table is unchanged.
    pub fn overwrite_row(&mut self, idx: usize, row: Row) -> Result<()> {
        if idx >= self.num_rows {
            return Err(Error::validation(format!(
                "row index {idx} out of range ({} rows)",
                self.num_rows
            )));
        }
        let kinds = self.plan(&row)?;
        self.apply_kinds(kinds)?;
        self.unindex_row(idx);

        let mut row = row;
        for column in &mut self.columns {
            let value = row.remove(&column.name).unwrap_or(Value::Null);
            column.data.set(idx, value)?;
        }
        self.index_row(idx);
        Ok(())
    }

    /// Resolve the column kind every value in `row` needs, without mutating.
    fn plan(&self, row: &Row) -> Result<Vec<(String, ColumnKind)>> {
        let mut kinds = Vec::new();
        for (name, value) in row {
            let Some(incoming) = ColumnKind::of(value) else {
                if !self.has_column(name) {
                    kinds.push((name.clone(), ColumnKind::Null));
                }
                continue;
            };
            let current = self
                .column(name)
                .map(|c| c.data.kind())
                .unwrap_or(ColumnKind::Null);
            let target = current.unify(incoming).ok_or_else(|| {
                Error::type_coercion(format!(
                    "column '{name}' holds {current}, cannot store {}",
                    value.type_name()
                ))
            })?;
            if Some(name.as_str()) == self.key_column() && target != ColumnKind::Int64 {
                return Err(Error::type_coercion(format!(
                    "key column '{name}' must hold int64 values"
                )));
            }
            kinds.push((name.clone(), target));
        }
        Ok(kinds)
    }

    /// Create or promote columns per a plan from [`Table::plan`].
    fn apply_kinds(&mut self, kinds: Vec<(String, ColumnKind)>) -> Result<()> {
        for (name, kind) in kinds {
            match self.columns.iter_mut().find(|c| c.name == name) {
                Some(column) => column.data.promote(kind)?,
                None => self
                    .columns
                    .push(Column::new(name, ColumnData::nulls(kind, self.num_rows))),
            }
        }
        Ok(())
    }

    fn key_of(&self, idx: usize) -> Option<i64> {
        let key_column = self.key_column.as_deref()?;
        self.value(idx, key_column).as_i64()
    }

    fn index_row(&mut self, idx: usize) {
        if let Some(k) = self.key_of(idx) {
            self.index.entry(k).or_default().push(idx);
        }
    }

    fn unindex_row(&mut self, idx: usize) {
        if let Some(k) = self.key_of(idx)
            && let Some(rows) = self.index.get_mut(&k)
        {
            rows.retain(|&i| i != idx);
            if rows.is_empty() {
                self.index.remove(&k);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
