//! Append-only history of occupancy readings

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::OccupancyReading;

use super::parquet;

/// Source of truth for the current run.
///
/// Holds every reading in time order, appended to only, and mirrors the
/// full table to a local parquet file after each append. The mirror is a
/// crash-recovery artifact; the remote dataset hub is authoritative across
/// restarts.
pub struct HistoryStore {
    rows: Vec<OccupancyReading>,
    mirror_path: PathBuf,
}

impl HistoryStore {
    /// Create a store over previously accumulated rows
    pub fn new(rows: Vec<OccupancyReading>, mirror_path: PathBuf) -> Self {
        Self { rows, mirror_path }
    }

    /// Load a store from the local mirror file; missing file means empty
    pub fn open_mirror(mirror_path: PathBuf) -> Result<Self> {
        let rows = parquet::read_history(&mirror_path)?;
        Ok(Self { rows, mirror_path })
    }

    /// Append one reading under its timestamp
    pub fn append(&mut self, reading: OccupancyReading) {
        self.rows.push(reading);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest(&self) -> Option<&OccupancyReading> {
        self.rows.last()
    }

    /// The full current table
    pub fn snapshot(&self) -> &[OccupancyReading] {
        &self.rows
    }

    pub fn mirror_path(&self) -> &Path {
        &self.mirror_path
    }

    /// Overwrite the local mirror with the full current table
    pub fn persist_local(&self) -> Result<()> {
        parquet::write_history(&self.mirror_path, &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn reading(minute: u32) -> OccupancyReading {
        let taken_at = NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap();
        OccupancyReading::new(taken_at, [1, 2, 3, 4, 5, 6])
    }

    #[test]
    fn test_append_grows_by_one_per_reading() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::new(vec![reading(0)], temp.path().join("history.parquet"));
        let before = store.len();

        for minute in 1..=5 {
            store.append(reading(minute));
        }

        assert_eq!(store.len(), before + 5);
        assert_eq!(store.latest().unwrap().taken_at, reading(5).taken_at);
    }

    #[test]
    fn test_persist_and_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history.parquet");

        let mut store = HistoryStore::new(Vec::new(), path.clone());
        store.append(reading(0));
        store.append(reading(3));
        store.persist_local().unwrap();

        let reopened = HistoryStore::open_mirror(path).unwrap();
        assert_eq!(reopened.snapshot(), store.snapshot());
    }

    #[test]
    fn test_open_missing_mirror_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = HistoryStore::open_mirror(temp.path().join("absent.parquet")).unwrap();
        assert!(store.is_empty());
    }
}
