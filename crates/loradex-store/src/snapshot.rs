//! Parquet snapshot persistence.
//!
//! A snapshot is one `.parquet` file holding the whole table. Writes go to a
//! temporary file in the destination directory which is then renamed over
//! the target, so readers never observe a half-written snapshot.
//!
//! # Column mapping
//!
//! | Table column | Arrow type written | Also accepted on read |
//! |--------------|--------------------|-----------------------|
//! | `Int64`      | `Int64`            | `Int32`               |
//! | `Float64`    | `Float64`          | `Float32`             |
//! | `Utf8`       | `Utf8`             | `LargeUtf8`           |
//! | `FloatList`  | `List<Float64>`    | `LargeList` / `FixedSizeList` of `Float32` or `Float64` |
//! | `Null`       | `Null`             |                       |

use crate::table::{Column, ColumnData, Table};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Float64Type, Int32Type, Int64Type};
use arrow_array::{
    Array, ArrayRef, Float64Array, Int64Array, ListArray, NullArray, RecordBatch, StringArray,
    new_empty_array,
};
use arrow_schema::{DataType, Field, Schema};
use loradex_core::{Error, Result};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension every snapshot must carry (compared case-insensitively).
pub const SNAPSHOT_EXTENSION: &str = "parquet";

/// Whether `path` has the snapshot extension.
pub fn has_snapshot_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
}

fn check_extension(path: &Path) -> Result<()> {
    if has_snapshot_extension(path) {
        Ok(())
    } else {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Err(Error::format(format!("expected a .parquet file, got: {name}")))
    }
}

// ============================================================================
// Write
// ============================================================================

/// Write `table` to `path`, creating parent directories.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    check_extension(path)?;
    let batch = build_record_batch(table)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| Error::io_with_path(e, &parent))?;

    let mut tmp =
        tempfile::NamedTempFile::new_in(&parent).map_err(|e| Error::io_with_path(e, &parent))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props))
        .map_err(|e| Error::format(format!("Failed to create snapshot writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::format(format!("Failed to write snapshot: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::format(format!("Failed to finish snapshot: {e}")))?;

    tmp.persist(path)
        .map_err(|e| Error::io_with_path(e.error, path))?;

    log::debug!(
        "Wrote snapshot with {} rows to {}",
        table.num_rows(),
        path.display()
    );
    Ok(())
}

/// Build an Arrow RecordBatch from the table's columns.
fn build_record_batch(table: &Table) -> Result<RecordBatch> {
    if table.columns().is_empty() {
        return Err(Error::validation("cannot snapshot a table with no columns"));
    }

    let arrays: Vec<ArrayRef> = table.columns().iter().map(column_to_array).collect();
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .zip(&arrays)
        .map(|(c, a)| Field::new(c.name(), a.data_type().clone(), true))
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .map_err(|e| Error::format(format!("Failed to create RecordBatch: {e}")))
}

fn column_to_array(column: &Column) -> ArrayRef {
    match column.data() {
        ColumnData::Null(n) => Arc::new(NullArray::new(*n)),
        ColumnData::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnData::Float64(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnData::Utf8(v) => Arc::new(StringArray::from(v.clone())),
        ColumnData::FloatList(v) => Arc::new(ListArray::from_iter_primitive::<Float64Type, _, _>(
            v.iter()
                .map(|cell| cell.as_ref().map(|xs| xs.iter().copied().map(Some))),
        )),
    }
}

// ============================================================================
// Read
// ============================================================================

/// Read a snapshot into a table (no key index set).
pub fn read_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    check_extension(path)?;

    let file = File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::format(format!("{}: not a readable parquet file: {e}", path.display())))?;

    let schema = builder.schema().clone();
    let mut columns: Vec<(String, ColumnData)> = schema
        .fields()
        .iter()
        .map(|f| {
            let empty = new_empty_array(f.data_type());
            column_from_array(f.name(), empty.as_ref()).map(|d| (f.name().clone(), d))
        })
        .collect::<Result<_>>()?;

    let reader = builder
        .build()
        .map_err(|e| Error::format(format!("Failed to open snapshot reader: {e}")))?;
    for batch in reader {
        let batch = batch.map_err(|e| Error::format(format!("Failed to read snapshot: {e}")))?;
        for (i, (name, data)) in columns.iter_mut().enumerate() {
            let cells = column_from_array(name, batch.column(i).as_ref())?;
            append_cells(data, cells)?;
        }
    }

    let table = Table::from_columns(
        columns
            .into_iter()
            .map(|(name, data)| Column::new(name, data))
            .collect(),
    )?;
    log::debug!(
        "Read snapshot with {} rows from {}",
        table.num_rows(),
        path.display()
    );
    Ok(table)
}

/// Convert one Arrow column into table cells.
fn column_from_array(name: &str, array: &dyn Array) -> Result<ColumnData> {
    let data = match array.data_type() {
        DataType::Null => ColumnData::Null(array.len()),
        DataType::Int64 => ColumnData::Int64(array.as_primitive::<Int64Type>().iter().collect()),
        DataType::Int32 => ColumnData::Int64(
            array
                .as_primitive::<Int32Type>()
                .iter()
                .map(|v| v.map(i64::from))
                .collect(),
        ),
        DataType::Float64 => {
            ColumnData::Float64(array.as_primitive::<Float64Type>().iter().collect())
        }
        DataType::Float32 => ColumnData::Float64(
            array
                .as_primitive::<Float32Type>()
                .iter()
                .map(|v| v.map(f64::from))
                .collect(),
        ),
        DataType::Utf8 => ColumnData::Utf8(
            array
                .as_string::<i32>()
                .iter()
                .map(|s| s.map(str::to_string))
                .collect(),
        ),
        DataType::LargeUtf8 => ColumnData::Utf8(
            array
                .as_string::<i64>()
                .iter()
                .map(|s| s.map(str::to_string))
                .collect(),
        ),
        DataType::List(_) => {
            let list = array.as_list::<i32>();
            ColumnData::FloatList(list_cells(name, list.len(), |i| {
                (!list.is_null(i)).then(|| list.value(i))
            })?)
        }
        DataType::LargeList(_) => {
            let list = array.as_list::<i64>();
            ColumnData::FloatList(list_cells(name, list.len(), |i| {
                (!list.is_null(i)).then(|| list.value(i))
            })?)
        }
        DataType::FixedSizeList(_, _) => {
            let list = array.as_fixed_size_list();
            ColumnData::FloatList(list_cells(name, list.len(), |i| {
                (!list.is_null(i)).then(|| list.value(i))
            })?)
        }
        other => {
            return Err(Error::format(format!(
                "column '{name}' has unsupported type {other}"
            )));
        }
    };
    Ok(data)
}

fn list_cells(
    name: &str,
    len: usize,
    cell: impl Fn(usize) -> Option<ArrayRef>,
) -> Result<Vec<Option<Vec<f64>>>> {
    (0..len)
        .map(|i| cell(i).map(|values| float_values(name, values.as_ref())).transpose())
        .collect()
}

fn float_values(name: &str, values: &dyn Array) -> Result<Vec<f64>> {
    if values.null_count() > 0 {
        return Err(Error::format(format!(
            "column '{name}' has a null element inside a list"
        )));
    }
    match values.data_type() {
        DataType::Float64 => Ok(values.as_primitive::<Float64Type>().values().to_vec()),
        DataType::Float32 => Ok(values
            .as_primitive::<Float32Type>()
            .values()
            .iter()
            .map(|&x| f64::from(x))
            .collect()),
        other => Err(Error::format(format!(
            "column '{name}' is a list of {other}, expected float32 or float64"
        ))),
    }
}

fn append_cells(dst: &mut ColumnData, src: ColumnData) -> Result<()> {
    match (dst, src) {
        (ColumnData::Null(a), ColumnData::Null(b)) => *a += b,
        (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend(b),
        (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend(b),
        (ColumnData::Utf8(a), ColumnData::Utf8(b)) => a.extend(b),
        (ColumnData::FloatList(a), ColumnData::FloatList(b)) => a.extend(b),
        (a, b) => {
            return Err(Error::format(format!(
                "batch column type changed from {} to {}",
                a.kind(),
                b.kind()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Copy
// ============================================================================

/// Copy a snapshot to a writable location.
///
/// Parent directories of `dest` are created. If `dest` already exists and
/// `overwrite` is false the copy is skipped. Returns `dest`.
pub fn copy_snapshot(src: &Path, dest: &Path, overwrite: bool) -> Result<PathBuf> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }

    if dest.exists() && !overwrite {
        log::debug!("Snapshot {} already exists, not copying", dest.display());
        return Ok(dest.to_path_buf());
    }
    if !src.exists() {
        return Err(Error::file_not_found(src));
    }

    std::fs::copy(src, dest).map_err(|e| Error::io_with_path(e, dest))?;
    log::info!("Copied snapshot {} -> {}", src.display(), dest.display());
    Ok(dest.to_path_buf())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{FixedSizeListArray, Float32Array, Int32Array, LargeStringArray};
    use tempfile::tempdir;

    fn sample_table() -> Table {
        Table::from_columns(vec![
            Column::new("version_id", ColumnData::Int64(vec![Some(1), Some(2)])),
            Column::new("model_name", ColumnData::Utf8(vec![Some("a".into()), None])),
            Column::new("strength", ColumnData::Float64(vec![Some(1.5), None])),
            Column::new(
                "direction",
                ColumnData::FloatList(vec![Some(vec![1.0, 0.0, 0.0]), None]),
            ),
            Column::new("note", ColumnData::Null(2)),
        ])
        .unwrap()
    }

    fn write_batch(path: &Path, batch: RecordBatch) {
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_has_snapshot_extension() {
        assert!(has_snapshot_extension(Path::new("db.parquet")));
        assert!(has_snapshot_extension(Path::new("DB.PARQUET")));
        assert!(!has_snapshot_extension(Path::new("db.csv")));
        assert!(!has_snapshot_extension(Path::new("parquet")));
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/db.parquet");

        let table = sample_table();
        write_table(&table, &path).unwrap();
        assert!(path.exists());

        let loaded = read_table(&path).unwrap();
        assert_eq!(loaded.columns(), table.columns());
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.parquet");
        write_table(&sample_table(), &path).unwrap();
        write_table(&sample_table(), &path).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_rejects_wrong_extension() {
        let dir = tempdir().unwrap();
        let err = write_table(&sample_table(), &dir.path().join("db.csv")).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_table(Path::new("/definitely/not/here.parquet")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_read_wrong_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.csv");
        std::fs::write(&path, "version_id\n1\n").unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(err.to_string().contains("expected a .parquet file"));
    }

    #[test]
    fn test_read_garbage_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.parquet");
        std::fs::write(&path, b"not parquet at all").unwrap();
        assert!(matches!(read_table(&path).unwrap_err(), Error::Format(_)));
    }

    #[test]
    fn test_read_accepts_narrow_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.parquet");

        let direction = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            2,
            Arc::new(Float32Array::from(vec![0.5f32, 0.25, 1.0, 0.0])),
            None,
        )
        .unwrap();
        let schema = Arc::new(Schema::new(vec![
            Field::new("version_id", DataType::Int32, true),
            Field::new("strength", DataType::Float32, true),
            Field::new("model_name", DataType::LargeUtf8, true),
            Field::new("direction", direction.data_type().clone(), true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![10, 11])),
                Arc::new(Float32Array::from(vec![0.5f32, 2.0])),
                Arc::new(LargeStringArray::from(vec!["x", "y"])),
                Arc::new(direction),
            ],
        )
        .unwrap();
        write_batch(&path, batch);

        let table = read_table(&path).unwrap();
        assert_eq!(
            table.column("version_id").unwrap().data(),
            &ColumnData::Int64(vec![Some(10), Some(11)])
        );
        assert_eq!(
            table.column("strength").unwrap().data(),
            &ColumnData::Float64(vec![Some(0.5), Some(2.0)])
        );
        assert_eq!(
            table.column("direction").unwrap().data(),
            &ColumnData::FloatList(vec![Some(vec![0.5, 0.25]), Some(vec![1.0, 0.0])])
        );
    }

    #[test]
    fn test_read_rejects_unsupported_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bool.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new(
            "flag",
            DataType::Boolean,
            true,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(arrow_array::BooleanArray::from(vec![true]))],
        )
        .unwrap();
        write_batch(&path, batch);

        let err = read_table(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn test_copy_snapshot() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.parquet");
        std::fs::write(&src, b"one").unwrap();
        let dest = dir.path().join("copies/dest.parquet");

        let out = copy_snapshot(&src, &dest, false).unwrap();
        assert_eq!(out, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"one");

        // Existing destination is kept unless overwrite is set.
        std::fs::write(&src, b"two").unwrap();
        copy_snapshot(&src, &dest, false).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"one");
        copy_snapshot(&src, &dest, true).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"two");
    }

    #[test]
    fn test_copy_snapshot_missing_source() {
        let dir = tempdir().unwrap();
        let err = copy_snapshot(
            &dir.path().join("missing.parquet"),
            &dir.path().join("dest.parquet"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
