//! Local mirror status command

use std::path::PathBuf;

use crate::error::Result;
use crate::models::LOCATIONS;
use crate::storage::{self, HistoryStore};

/// Show the state of the local history mirror
pub async fn status(data_dir: Option<PathBuf>) -> Result<()> {
    let mirror = storage::mirror_path(data_dir);
    if !mirror.exists() {
        println!("No local history at: {}", mirror.display());
        println!("Run 'occupancy run' to start measuring.");
        return Ok(());
    }

    let history = HistoryStore::open_mirror(mirror.clone())?;
    println!("Local mirror: {}", mirror.display());
    println!("Readings:     {}", history.len());

    if let (Some(first), Some(latest)) = (history.snapshot().first(), history.latest()) {
        println!(
            "Span:         {} .. {}",
            first.timestamp_text(),
            latest.timestamp_text()
        );
        println!("Latest:");
        for (location, level) in LOCATIONS.iter().zip(latest.levels) {
            println!("  {location:<20} {level:>3}%");
        }
    }
    Ok(())
}
