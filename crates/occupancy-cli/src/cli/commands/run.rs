//! The measurement loop command

use std::path::PathBuf;

use tracing::info;

use crate::client::{FetchOptions, FirebaseClient, HubClient, WebDriverFetcher};
use crate::error::Result;
use crate::monitor::{MonitorEngine, MonitorOptions};
use crate::storage::{self, HistoryStore};

/// Load the remote history, then run the monitor loop (or a single round
/// with `once`)
#[allow(clippy::too_many_arguments)]
pub async fn run(
    webdriver_url: String,
    fetch_options: FetchOptions,
    database_url: String,
    firebase_auth: Option<String>,
    hub_endpoint: String,
    repo: String,
    hub_token: Option<String>,
    data_dir: Option<PathBuf>,
    options: MonitorOptions,
    once: bool,
) -> Result<()> {
    let hub = HubClient::new(&hub_endpoint, &repo, hub_token);

    info!("Loading history from {repo}");
    let rows = hub.load_all().await?;
    info!("Loaded {} readings", rows.len());

    let mirror = storage::mirror_path(data_dir);
    let history = HistoryStore::new(rows, mirror);
    let fetcher = WebDriverFetcher::new(&webdriver_url, fetch_options);
    let live = FirebaseClient::new(&database_url, firebase_auth);

    let mut engine = MonitorEngine::new(fetcher, live, hub, history, options);
    if once {
        engine.run_round().await;
        Ok(())
    } else {
        engine.run().await
    }
}
