use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::poller::Poller;
use crate::storage::Ingest;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("no pollable feeds: the configuration has no valid feed URL")]
    NoFeeds,
}

/// Starts one [`Poller`] per feed and stops them all together.
pub struct Supervisor {
    client: Client,
    storage: Arc<dyn Ingest>,
    period: Duration,
    shutdown: CancellationToken,
    workers: JoinSet<()>,
}

impl Supervisor {
    pub fn new(client: Client, storage: Arc<dyn Ingest>, period: Duration) -> Self {
        Self {
            client,
            storage,
            period,
            shutdown: CancellationToken::new(),
            workers: JoinSet::new(),
        }
    }

    /// Spawn a poller for every valid URL in `urls`.
    ///
    /// Invalid URLs are logged and skipped. Returns how many pollers were
    /// started, or [`SupervisorError::NoFeeds`] without starting anything
    /// when not a single URL is usable.
    pub fn start<S: AsRef<str>>(&mut self, urls: &[S]) -> Result<usize, SupervisorError> {
        let valid: Vec<&str> = urls
            .iter()
            .map(AsRef::as_ref)
            .filter(|url| match validate_url(url) {
                Ok(()) => true,
                Err(reason) => {
                    warn!(url = %url, reason, "skipping invalid feed url");
                    false
                }
            })
            .collect();

        if valid.is_empty() {
            return Err(SupervisorError::NoFeeds);
        }

        for url in &valid {
            let poller = Poller::new(
                *url,
                self.period,
                self.client.clone(),
                self.storage.clone(),
                self.shutdown.clone(),
            );
            self.workers.spawn(poller.run());
        }

        info!(pollers = valid.len(), "ingestion started");
        Ok(valid.len())
    }

    /// Number of pollers that have not exited yet.
    pub fn active(&self) -> usize {
        self.workers.len()
    }

    /// Signal every poller to stop and wait until all of them have exited.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "poller task failed");
            }
        }

        debug!("all pollers stopped");
    }
}

/// Accept absolute http(s) URLs that name a host.
pub fn validate_url(raw: &str) -> Result<(), &'static str> {
    let url = Url::parse(raw).map_err(|_| "not a valid url")?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err("scheme must be http or https");
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("url has no host");
    }

    Ok(())
}
