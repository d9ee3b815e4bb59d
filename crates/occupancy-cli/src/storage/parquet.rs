//! Parquet encoding of the occupancy history
//!
//! Uses Arrow record batches with one text `index` column and one Int64
//! column per location, the same shape the dataset hub serves back. Files
//! are written atomically (temp file + rename), so readers always see
//! consistent data.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{OccupancyError, Result};
use crate::models::{OccupancyReading, LOCATIONS, LOCATION_COUNT, TIMESTAMP_FORMAT};

/// Column name of the text timestamp
pub const INDEX_COLUMN: &str = "index";

fn history_schema() -> Arc<Schema> {
    let mut fields = vec![Field::new(INDEX_COLUMN, DataType::Utf8, false)];
    fields.extend(
        LOCATIONS
            .iter()
            .map(|location| Field::new(*location, DataType::Int64, false)),
    );
    Arc::new(Schema::new(fields))
}

/// Build the history record batch: timestamps as text, levels as Int64
pub fn readings_to_batch(rows: &[OccupancyReading]) -> Result<RecordBatch> {
    let index: StringArray = rows.iter().map(|r| Some(r.timestamp_text())).collect();
    let mut columns: Vec<ArrayRef> = vec![Arc::new(index)];
    for i in 0..LOCATION_COUNT {
        let levels: Int64Array = rows.iter().map(|r| Some(r.levels[i])).collect();
        columns.push(Arc::new(levels));
    }

    RecordBatch::try_new(history_schema(), columns)
        .map_err(|e| OccupancyError::storage(format!("Failed to create record batch: {e}")))
}

/// Decode one record batch back into readings.
///
/// Columns are matched by name, and every occupancy column is coerced to
/// Int64. A missing column, a failed coercion, a null, or an unparseable
/// timestamp means the table cannot be trusted and fails the startup load.
pub fn batch_to_readings(batch: &RecordBatch) -> Result<Vec<OccupancyReading>> {
    let index = batch
        .column_by_name(INDEX_COLUMN)
        .ok_or_else(|| OccupancyError::startup_data("history table has no index column"))?;
    let index = index
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            OccupancyError::startup_data(format!(
                "index column has type {}, expected Utf8",
                index.data_type()
            ))
        })?;

    let cast_options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let mut level_columns = Vec::with_capacity(LOCATION_COUNT);
    for location in LOCATIONS {
        let column = batch.column_by_name(location).ok_or_else(|| {
            OccupancyError::startup_data(format!("history table has no {location:?} column"))
        })?;
        let column = cast_with_options(column, &DataType::Int64, &cast_options).map_err(|e| {
            OccupancyError::startup_data(format!(
                "{location:?} column is not castable to integer: {e}"
            ))
        })?;
        if column.null_count() > 0 {
            return Err(OccupancyError::startup_data(format!(
                "{location:?} column contains nulls"
            )));
        }
        let column = column.as_any().downcast_ref::<Int64Array>().unwrap().clone();
        level_columns.push(column);
    }

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        if !index.is_valid(i) {
            return Err(OccupancyError::startup_data("index column contains nulls"));
        }
        let taken_at = NaiveDateTime::parse_from_str(index.value(i), TIMESTAMP_FORMAT)
            .map_err(|e| {
                OccupancyError::startup_data(format!(
                    "bad timestamp {:?} in history table: {e}",
                    index.value(i)
                ))
            })?;

        let mut levels = [0i64; LOCATION_COUNT];
        for (j, column) in level_columns.iter().enumerate() {
            levels[j] = column.value(i);
        }
        rows.push(OccupancyReading::new(taken_at, levels));
    }

    Ok(rows)
}

/// Overwrite `path` with the full history, atomically
pub fn write_history(path: &Path, rows: &[OccupancyReading]) -> Result<()> {
    let batch = readings_to_batch(rows)?;

    let temp_path = path.with_extension("parquet.tmp");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| OccupancyError::storage(format!("Failed to create directory: {e}")))?;
    }

    let file = File::create(&temp_path)
        .map_err(|e| OccupancyError::storage(format!("Failed to create temp file: {e}")))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| OccupancyError::storage(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| OccupancyError::storage(format!("Failed to write batch: {e}")))?;
    writer
        .close()
        .map_err(|e| OccupancyError::storage(format!("Failed to close writer: {e}")))?;

    fs::rename(&temp_path, path)
        .map_err(|e| OccupancyError::storage(format!("Failed to rename temp file: {e}")))?;

    Ok(())
}

/// Read the full history from `path`; a missing file is an empty history
pub fn read_history(path: &Path) -> Result<Vec<OccupancyReading>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| OccupancyError::storage(format!("Failed to open {path:?}: {e}")))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| OccupancyError::startup_data(format!("Failed to create reader: {e}")))?
        .build()
        .map_err(|e| OccupancyError::startup_data(format!("Failed to build reader: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| OccupancyError::startup_data(format!("Failed to read batch: {e}")))?;
        rows.extend(batch_to_readings(&batch)?);
    }
    Ok(rows)
}

/// Decode a parquet partition fetched from the dataset hub
pub fn readings_from_bytes(bytes: Bytes) -> Result<Vec<OccupancyReading>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| OccupancyError::startup_data(format!("Failed to create reader: {e}")))?
        .build()
        .map_err(|e| OccupancyError::startup_data(format!("Failed to build reader: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| OccupancyError::startup_data(format!("Failed to read batch: {e}")))?;
        rows.extend(batch_to_readings(&batch)?);
    }
    Ok(rows)
}

/// Encode the full history into an in-memory parquet buffer for upload
pub fn readings_to_bytes(rows: &[OccupancyReading]) -> Result<Vec<u8>> {
    let batch = readings_to_batch(rows)?;
    let mut buf = Vec::new();

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();

    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))
        .map_err(|e| OccupancyError::storage(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| OccupancyError::storage(format!("Failed to write batch: {e}")))?;
    writer
        .close()
        .map_err(|e| OccupancyError::storage(format!("Failed to close writer: {e}")))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn reading(minute: u32, base: i64) -> OccupancyReading {
        let taken_at = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap();
        OccupancyReading::new(taken_at, [base, base + 1, base + 2, base + 3, base + 4, base + 5])
    }

    #[test]
    fn test_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.parquet");
        let rows = vec![reading(0, 10), reading(3, 20), reading(6, 30)];

        write_history(&path, &rows).unwrap();
        let read_back = read_history(&path).unwrap();

        assert_eq!(read_back, rows);
        assert!(!path.with_extension("parquet.tmp").exists());
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let rows = read_history(&temp.path().join("absent.parquet")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_bytes_round_trip() {
        let rows = vec![reading(0, 42)];
        let buf = readings_to_bytes(&rows).unwrap();
        let read_back = readings_from_bytes(Bytes::from(buf)).unwrap();
        assert_eq!(read_back, rows);
    }

    #[test]
    fn test_numeric_text_column_is_coerced() {
        // A column that arrives as text but holds integers still loads
        let index: StringArray = vec![Some("2025-03-14 12:00:00")].into_iter().collect();
        let mut columns: Vec<ArrayRef> = vec![Arc::new(index)];
        for value in ["42", "10", "5", "8", "0", "99"] {
            let col: StringArray = vec![Some(value)].into_iter().collect();
            columns.push(Arc::new(col));
        }
        let mut fields = vec![Field::new(INDEX_COLUMN, DataType::Utf8, false)];
        fields.extend(
            LOCATIONS
                .iter()
                .map(|location| Field::new(*location, DataType::Utf8, false)),
        );
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        let rows = batch_to_readings(&batch).unwrap();
        assert_eq!(rows[0].levels, [42, 10, 5, 8, 0, 99]);
    }

    #[test]
    fn test_corrupt_column_fails_startup() {
        let index: StringArray = vec![Some("2025-03-14 12:00:00")].into_iter().collect();
        let mut columns: Vec<ArrayRef> = vec![Arc::new(index)];
        let bad: StringArray = vec![Some("not-a-number")].into_iter().collect();
        columns.push(Arc::new(bad));
        for _ in 1..LOCATION_COUNT {
            let col: Int64Array = vec![Some(0)].into_iter().collect();
            columns.push(Arc::new(col));
        }
        let mut fields = vec![
            Field::new(INDEX_COLUMN, DataType::Utf8, false),
            Field::new(LOCATIONS[0], DataType::Utf8, false),
        ];
        fields.extend(
            LOCATIONS[1..]
                .iter()
                .map(|location| Field::new(*location, DataType::Int64, false)),
        );
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();

        let err = batch_to_readings(&batch).unwrap_err();
        assert!(matches!(err, OccupancyError::StartupData(_)));
    }

    #[test]
    fn test_missing_column_fails_startup() {
        let index: StringArray = vec![Some("2025-03-14 12:00:00")].into_iter().collect();
        let batch = RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new(INDEX_COLUMN, DataType::Utf8, false)])),
            vec![Arc::new(index) as ArrayRef],
        )
        .unwrap();

        let err = batch_to_readings(&batch).unwrap_err();
        assert!(matches!(err, OccupancyError::StartupData(_)));
    }

    #[test]
    fn test_bad_timestamp_fails_startup() {
        let index: StringArray = vec![Some("yesterday-ish")].into_iter().collect();
        let mut columns: Vec<ArrayRef> = vec![Arc::new(index)];
        for _ in 0..LOCATION_COUNT {
            let col: Int64Array = vec![Some(0)].into_iter().collect();
            columns.push(Arc::new(col));
        }
        let batch = RecordBatch::try_new(history_schema(), columns).unwrap();

        let err = batch_to_readings(&batch).unwrap_err();
        assert!(matches!(err, OccupancyError::StartupData(_)));
    }
}
