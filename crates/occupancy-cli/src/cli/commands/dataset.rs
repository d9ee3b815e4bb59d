//! Dataset commands

use std::path::PathBuf;

use crate::client::hub::DEFAULT_COMMIT_MESSAGE;
use crate::client::HubClient;
use crate::error::Result;
use crate::storage::{self, HistoryStore};

/// Force a push of the locally mirrored history to the dataset repository
pub async fn push(
    hub_endpoint: String,
    repo: String,
    hub_token: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let mirror = storage::mirror_path(data_dir);
    let history = HistoryStore::open_mirror(mirror)?;
    if history.is_empty() {
        println!("No local history to push.");
        return Ok(());
    }

    let hub = HubClient::new(&hub_endpoint, &repo, hub_token);
    hub.push_history(history.snapshot(), DEFAULT_COMMIT_MESSAGE)
        .await?;
    println!("Pushed {} readings to {repo}", history.len());
    Ok(())
}
