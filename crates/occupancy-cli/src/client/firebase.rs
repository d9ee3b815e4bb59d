//! Live-state store client
//!
//! Publishes the most recent reading to the realtime database over its
//! REST surface. The store keeps no history at this layer; every publish
//! overwrites the root document (last-write-wins).

use std::time::Duration;

use crate::error::{OccupancyError, Result};
use crate::models::OccupancyReading;

/// Client for the realtime database holding the current snapshot
pub struct FirebaseClient {
    client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
}

impl FirebaseClient {
    /// Create a client for the given database URL. The auth token is the
    /// database secret, appended as the `auth` query parameter; `None`
    /// works for databases with open write rules.
    pub fn new(database_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Overwrite the database root with the latest reading
    pub async fn publish_current(&self, reading: &OccupancyReading) -> Result<()> {
        let url = format!("{}/.json", self.database_url);
        let mut request = self.client.put(&url).json(&reading.live_snapshot());
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OccupancyError::publish(format!("Live publish failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OccupancyError::publish(format!(
                "Live publish failed with {status}: {body}"
            )));
        }
        Ok(())
    }
}
