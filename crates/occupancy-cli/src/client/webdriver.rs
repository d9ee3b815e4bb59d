//! WebDriver-based page fetcher
//!
//! The occupancy page renders its numbers client-side, so plain HTTP GET
//! returns an empty shell. This client drives a headless Chrome through a
//! chromedriver endpoint using the W3C WebDriver wire protocol: one fresh
//! session per fetch, deleted on every exit path so no browser session
//! leaks across attempts.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{OccupancyError, Result};

/// Default chromedriver endpoint
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Real-time visitor page for the library building
pub const DEFAULT_PAGE_URL: &str =
    "https://www.kth.se/en/biblioteket/anvanda-biblioteket/oppettider-kontakt/besokare-i-realtid-1.1078198";

/// W3C element identifier key in element responses
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Settings for one rendering session
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Page to navigate to
    pub page_url: String,
    /// Navigation timeout passed to the driver
    pub page_load_timeout: Duration,
    /// Fixed wait for client-side rendering after navigation
    pub settle_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            page_load_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewSessionResponse {
    value: NewSessionValue,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ElementResponse {
    value: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    value: String,
}

/// Fetches the occupancy page's visible body text through a WebDriver
/// endpoint
pub struct WebDriverFetcher {
    client: reqwest::Client,
    base_url: String,
    options: FetchOptions,
}

impl WebDriverFetcher {
    /// Create a fetcher against the given chromedriver endpoint
    pub fn new(webdriver_url: &str, options: FetchOptions) -> Self {
        // The HTTP timeout must outlast a navigation that runs into the
        // driver-side page-load timeout
        let http_timeout = options.page_load_timeout + Duration::from_secs(30);
        Self {
            client: reqwest::Client::builder()
                .timeout(http_timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: webdriver_url.trim_end_matches('/').to_string(),
            options,
        }
    }

    /// Load the page in a fresh headless session and return the visible
    /// body text. The session is deleted before returning, whether the
    /// fetch succeeded or not.
    pub async fn fetch_page(&self) -> Result<String> {
        let session_id = self.start_session().await?;
        let result = self.load_body_text(&session_id).await;
        self.end_session(&session_id).await;
        result
    }

    /// Start an automation-hardened headless Chrome session
    async fn start_session(&self) -> Result<String> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--no-sandbox",
                            "--disable-dev-shm-usage",
                            "--disable-gpu",
                            "--window-size=1920,1080",
                            "--disable-blink-features=AutomationControlled",
                        ]
                    }
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Failed to start rendering session: {e}")))?;
        let response = expect_ok(response, "session start").await?;

        let session: NewSessionResponse = response
            .json()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Bad session response: {e}")))?;
        Ok(session.value.session_id)
    }

    async fn load_body_text(&self, session_id: &str) -> Result<String> {
        self.command(
            session_id,
            "timeouts",
            json!({ "pageLoad": self.options.page_load_timeout.as_millis() as u64 }),
        )
        .await?;
        self.command(session_id, "url", json!({ "url": self.options.page_url }))
            .await?;

        // Let client-side rendering finish before reading the DOM
        tokio::time::sleep(self.options.settle_delay).await;

        let response = self
            .client
            .post(format!("{}/session/{session_id}/element", self.base_url))
            .json(&json!({ "using": "tag name", "value": "body" }))
            .send()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Failed to locate body element: {e}")))?;
        let response = expect_ok(response, "body lookup").await?;
        let element: ElementResponse = response
            .json()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Bad element response: {e}")))?;
        let element_id = element
            .value
            .get(ELEMENT_KEY)
            .or_else(|| element.value.values().next())
            .ok_or_else(|| OccupancyError::fetch("Page has no body element"))?;

        let response = self
            .client
            .get(format!(
                "{}/session/{session_id}/element/{element_id}/text",
                self.base_url
            ))
            .send()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Failed to read body text: {e}")))?;
        let response = expect_ok(response, "body text").await?;
        let text: TextResponse = response
            .json()
            .await
            .map_err(|e| OccupancyError::fetch(format!("Bad text response: {e}")))?;

        Ok(text.value)
    }

    /// POST a session command and discard the response body
    async fn command(&self, session_id: &str, name: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/session/{session_id}/{name}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| OccupancyError::fetch(format!("{name} command failed: {e}")))?;
        expect_ok(response, name).await?;
        Ok(())
    }

    /// Delete the session; best effort, the driver reaps leftovers on its
    /// own timeout
    async fn end_session(&self, session_id: &str) {
        let result = self
            .client
            .delete(format!("{}/session/{session_id}", self.base_url))
            .send()
            .await;
        if let Err(e) = result {
            debug!("Failed to delete rendering session {session_id}: {e}");
        }
    }
}

async fn expect_ok(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OccupancyError::fetch(format!(
        "{action} failed with {status}: {body}"
    )))
}
