use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::normalizer;
use crate::rss::{self, DecodeError};
use crate::storage::Ingest;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("storing posts failed: {0:#}")]
    Store(anyhow::Error),
}

/// Build the HTTP client shared by every poller.
pub fn http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(request_timeout)
        .user_agent("Newsroom/1.0 (RSS Aggregator)")
        .build()
}

/// Worker that owns one feed URL and polls it until shut down.
pub struct Poller {
    url: String,
    period: Duration,
    client: Client,
    storage: Arc<dyn Ingest>,
    shutdown: CancellationToken,
}

impl Poller {
    pub fn new(
        url: impl Into<String>,
        period: Duration,
        client: Client,
        storage: Arc<dyn Ingest>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            url: url.into(),
            period,
            client,
            storage,
            shutdown,
        }
    }

    /// Poll the feed every `period` until the shutdown token fires.
    ///
    /// A failed cycle is logged and retried on the next tick; nothing that
    /// happens inside a cycle stops the loop. Cancellation drops whatever
    /// step is in flight, aborting an outstanding request.
    pub async fn run(self) {
        info!(url = %self.url, "poller started");

        loop {
            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            self.report(outcome);

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        info!(url = %self.url, "poller stopped");
    }

    /// Run a single fetch, decode, normalize and store cycle.
    pub async fn poll_once(&self) -> Result<usize, PollError> {
        debug!(url = %self.url, "requesting feed");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status));
        }

        // Reading the body to the end lets the connection go back to the pool.
        let body = response.bytes().await?;

        let feed = rss::parse(Some(&body[..]))?;
        debug!(url = %self.url, items = feed.items.len(), "feed decoded");

        let posts = normalizer::normalize(feed);
        self.storage.add_posts(posts).await.map_err(PollError::Store)
    }

    fn report(&self, outcome: Result<usize, PollError>) {
        match outcome {
            Ok(0) => info!(url = %self.url, "no new posts"),
            Ok(added) => info!(url = %self.url, posts = added, "posts added"),
            Err(e @ (PollError::Fetch(_) | PollError::Status(_))) => {
                error!(url = %self.url, error = %e, "failed to fetch feed")
            }
            Err(e @ PollError::Decode(_)) => {
                error!(url = %self.url, error = %e, "failed to decode feed")
            }
            Err(e @ PollError::Store(_)) => {
                error!(url = %self.url, error = %e, "failed to store posts")
            }
        }
    }
}
