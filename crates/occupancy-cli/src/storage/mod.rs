//! Local storage for the occupancy history
//!
//! The on-disk state is a single parquet mirror of the full history table,
//! overwritten atomically (temp file + rename) after every successful
//! measurement:
//!
//! ```text
//! ~/.local/share/occupancy/
//! └── history.parquet
//! ```
//!
//! External tools can query the mirror directly, e.g. with DuckDB:
//!
//! ```sql
//! SELECT * FROM 'history.parquet' ORDER BY "index" DESC LIMIT 10;
//! ```

mod history;
pub mod parquet;

pub use history::HistoryStore;

use std::path::PathBuf;

/// File name of the local history mirror
pub const MIRROR_FILE: &str = "history.parquet";

/// Get the default storage path
pub fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("occupancy")
}

/// Resolve the mirror file path, honoring a data-dir override
pub fn mirror_path(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir
        .unwrap_or_else(default_storage_path)
        .join(MIRROR_FILE)
}
