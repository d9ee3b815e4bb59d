//! Measurement loop for the occupancy monitor
//!
//! Repeats fetch → parse → persist → publish rounds forever. Each round
//! makes up to a bounded number of attempts with a fixed delay between
//! them; a round that exhausts its attempts leaves a gap in the history
//! and defers to the next round. Everything runs on one sequential task.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::client::{FirebaseClient, HubClient, WebDriverFetcher};
use crate::client::hub::DEFAULT_COMMIT_MESSAGE;
use crate::error::Result;
use crate::parse;
use crate::storage::HistoryStore;

/// Timing and cadence settings for the measurement loop
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Attempts per round before giving up until the next round
    pub max_attempts: u32,
    /// Delay between attempts within a round
    pub retry_delay: Duration,
    /// Delay between rounds, successful or not
    pub round_delay: Duration,
    /// Successful readings between dataset pushes
    pub push_every: u32,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(60),
            round_delay: Duration::from_secs(180),
            push_every: 10,
        }
    }
}

/// Counts successful readings and fires once every `every` of them.
/// The counter resets when a push becomes due, not when it succeeds, so a
/// failed push is superseded by the next one rather than retried.
#[derive(Debug)]
struct PushCadence {
    every: u32,
    pending: u32,
}

impl PushCadence {
    fn new(every: u32) -> Self {
        Self { every, pending: 0 }
    }

    fn record_success(&mut self) -> bool {
        self.pending += 1;
        if self.pending >= self.every {
            self.pending = 0;
            true
        } else {
            false
        }
    }
}

/// Orchestrates the scrape→parse→persist→publish pipeline
pub struct MonitorEngine {
    fetcher: WebDriverFetcher,
    live: FirebaseClient,
    hub: HubClient,
    history: HistoryStore,
    options: MonitorOptions,
    cadence: PushCadence,
}

impl MonitorEngine {
    pub fn new(
        fetcher: WebDriverFetcher,
        live: FirebaseClient,
        hub: HubClient,
        history: HistoryStore,
        options: MonitorOptions,
    ) -> Self {
        let cadence = PushCadence::new(options.push_every);
        Self {
            fetcher,
            live,
            hub,
            history,
            options,
            cadence,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Run rounds forever, sleeping the round delay between them
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_round().await;
            tokio::time::sleep(self.options.round_delay).await;
        }
    }

    /// One attempt window: up to `max_attempts` measurement cycles,
    /// stopping at the first success
    pub async fn run_round(&mut self) {
        for attempt in 1..=self.options.max_attempts {
            match self.run_cycle().await {
                Ok(()) => return,
                Err(e) if attempt < self.options.max_attempts => {
                    warn!(
                        "Attempt {attempt}/{} failed: {e}",
                        self.options.max_attempts
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        "Attempt {attempt}/{} failed: {e}; waiting for next scheduled round",
                        self.options.max_attempts
                    );
                }
            }
        }
    }

    /// One measurement cycle: fetch, parse, persist, publish.
    /// Publish failures are logged here and do not consume an attempt;
    /// the reading is already durable by the time the sinks run.
    async fn run_cycle(&mut self) -> Result<()> {
        let content = self.fetcher.fetch_page().await?;
        let reading = parse::parse_reading(&content, parse::facility_now())?;
        info!(
            "Measured {} at {}",
            reading
                .levels
                .map(|v| format!("{v}%"))
                .join(" "),
            reading.timestamp_text()
        );

        self.history.append(reading.clone());
        self.history.persist_local()?;

        if let Err(e) = self.live.publish_current(&reading).await {
            warn!("{e}");
        }

        if self.cadence.record_success() {
            match self
                .hub
                .push_history(self.history.snapshot(), DEFAULT_COMMIT_MESSAGE)
                .await
            {
                Ok(()) => info!("Pushed {} readings to the dataset hub", self.history.len()),
                Err(e) => warn!("{e}"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pushes_after(cycles: u32, every: u32) -> u32 {
        let mut cadence = PushCadence::new(every);
        let mut pushes = 0;
        for _ in 0..cycles {
            if cadence.record_success() {
                pushes += 1;
            }
        }
        pushes
    }

    #[test]
    fn test_push_cadence_fires_every_tenth_success() {
        assert_eq!(pushes_after(9, 10), 0);
        assert_eq!(pushes_after(10, 10), 1);
        assert_eq!(pushes_after(11, 10), 1);
        assert_eq!(pushes_after(20, 10), 2);
    }

    #[test]
    fn test_push_cadence_resets_after_trigger() {
        let mut cadence = PushCadence::new(10);
        for _ in 0..9 {
            assert!(!cadence.record_success());
        }
        assert!(cadence.record_success());
        assert_eq!(cadence.pending, 0);
    }
}
