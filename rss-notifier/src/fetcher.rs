use crate::types::{FetchConfig, RelayError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Minimum spacing between two requests to the same host.
const HOST_INTERVAL: Duration = Duration::from_secs(1);

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Download a feed document, retrying transport errors and non-2xx
    /// responses with exponential backoff.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let started = Instant::now();
        self.wait_for_host(url).await?;

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 8),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.fetch_once(url).await {
                Ok(body) => {
                    info!(
                        "Fetched feed {} ({} bytes in {}ms)",
                        url,
                        body.len(),
                        started.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                Err(e @ RelayError::FeedTooLarge { .. }) => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                }
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RelayError::General(format!("Failed to fetch {}", url))))
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(RelayError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            check_feed_size(content_length as usize, self.config.max_feed_size_mb)?;
        }

        // Content-Length is absent on chunked responses, so count as we read.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            check_feed_size(body.len(), self.config.max_feed_size_mb)?;
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn wait_for_host(&self, url: &str) -> Result<()> {
        let host = Url::parse(url)?.host_str().unwrap_or("").to_string();

        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = last_request.get(&host) {
            let elapsed = previous.elapsed();
            if elapsed < HOST_INTERVAL {
                let wait_time = HOST_INTERVAL - elapsed;
                debug!("Spacing requests to {}: waiting {:?}", host, wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        last_request.insert(host, Instant::now());

        Ok(())
    }
}

/// Fails once `bytes` exceeds `max_mb` whole megabytes.
pub fn check_feed_size(bytes: usize, max_mb: usize) -> Result<()> {
    let size_mb = bytes / (1024 * 1024);
    if size_mb > max_mb {
        return Err(RelayError::FeedTooLarge { size_mb });
    }
    Ok(())
}
