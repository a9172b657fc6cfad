use crate::traits::FeedSource;
use crate::types::{LiveSourceSpec, RawEntry, RelayError, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Generic RSS/Atom feed source backed by the shared HTTP fetcher
pub struct RssFeedSource {
    spec: LiveSourceSpec,
    fetcher: Arc<Fetcher>,
}

impl RssFeedSource {
    pub fn new(spec: LiveSourceSpec, fetcher: Arc<Fetcher>) -> Self {
        Self { spec, fetcher }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn spec(&self) -> &LiveSourceSpec {
        &self.spec
    }

    async fn pull(&self) -> Result<Vec<RawEntry>> {
        info!("Pulling feed: {}", self.spec.uri);

        let content = self.fetcher.fetch(&self.spec.uri).await?;

        if !FeedParser::is_valid_feed_content(&content) {
            warn!("Response from {} does not look like a feed", self.spec.uri);
            return Err(RelayError::Parse(format!("{} did not return a feed document", self.spec.uri)));
        }

        let entries = FeedParser::parse(&content)?;
        info!("Pulled {} entries from {}", entries.len(), self.spec.uri);
        Ok(entries)
    }
}
