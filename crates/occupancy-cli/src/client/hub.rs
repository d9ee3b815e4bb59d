//! Dataset hub client
//!
//! The accumulated history lives in a versioned dataset repository. At
//! startup every parquet partition is downloaded and merged into one
//! time-ordered table; every tenth successful reading the full table is
//! pushed back as a new non-destructive revision through the hub's NDJSON
//! commit endpoint.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::json;
use tracing::debug;

use crate::error::{OccupancyError, Result};
use crate::models::OccupancyReading;
use crate::storage::parquet;

/// Default hub endpoint
pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";

/// Commit message used for scheduled history pushes
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update dataset";

/// Path of the history file inside the dataset repository
const HISTORY_FILE_PATH: &str = "data/train-00000-of-00001.parquet";

/// Parquet listing: config name → split name → partition URLs
type ParquetListing = HashMap<String, HashMap<String, Vec<String>>>;

/// Client for the remote dataset repository
pub struct HubClient {
    client: reqwest::Client,
    endpoint: String,
    repo: String,
    token: Option<String>,
}

impl HubClient {
    /// Create a client for `repo` (e.g. `davnas/occupancy_perc`)
    pub fn new(endpoint: &str, repo: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            token,
        }
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Load and merge every parquet partition of the dataset into one
    /// time-ordered history. A repository that does not exist yet loads as
    /// an empty history; anything else that fails here is fatal, since the
    /// run would otherwise build on data it cannot trust.
    pub async fn load_all(&self) -> Result<Vec<OccupancyReading>> {
        let url = format!("{}/api/datasets/{}/parquet", self.endpoint, self.repo);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await
            .map_err(|e| OccupancyError::startup_data(format!("Partition listing failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Dataset {} not found, starting with empty history", self.repo);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(OccupancyError::startup_data(format!(
                "Partition listing failed with {}",
                response.status()
            )));
        }

        let listing: ParquetListing = response
            .json()
            .await
            .map_err(|e| OccupancyError::startup_data(format!("Bad partition listing: {e}")))?;

        let mut rows = Vec::new();
        for splits in listing.values() {
            for urls in splits.values() {
                for url in urls {
                    let bytes = self.download(url).await?;
                    rows.extend(parquet::readings_from_bytes(bytes)?);
                }
            }
        }
        rows.sort_by_key(|r| r.taken_at);
        Ok(rows)
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .send()
            .await
            .map_err(|e| OccupancyError::startup_data(format!("Partition download failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OccupancyError::startup_data(format!(
                "Partition download failed with {}: {url}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| OccupancyError::startup_data(format!("Partition download failed: {e}")))
    }

    /// Push the full history as a new dataset revision, tagged with a
    /// commit message
    pub async fn push_history(&self, rows: &[OccupancyReading], message: &str) -> Result<()> {
        let buf = parquet::readings_to_bytes(rows)
            .map_err(|e| OccupancyError::publish(format!("Failed to encode history: {e}")))?;
        let content = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, buf);

        // NDJSON commit: one header op, one file op
        let header = json!({
            "key": "header",
            "value": { "summary": message, "description": "" }
        });
        let file = json!({
            "key": "file",
            "value": {
                "path": HISTORY_FILE_PATH,
                "content": content,
                "encoding": "base64"
            }
        });
        let body = format!("{header}\n{file}\n");

        let url = format!("{}/api/datasets/{}/commit/main", self.endpoint, self.repo);
        let mut headers = self.auth_headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| OccupancyError::publish(format!("Dataset push failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OccupancyError::publish(format!(
                "Dataset push failed with {status}: {body}"
            )));
        }
        Ok(())
    }
}
