use crate::notifier::{SinkOutcome, WebhookMessage};
use crate::types::{LiveSourceSpec, RawEntry, Result};
use async_trait::async_trait;

/// Trait for pulling entries from a feed (RSS, Atom, canned fixtures, ...)
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Descriptor of the feed: URL, trust flag, entry limit
    fn spec(&self) -> &LiveSourceSpec;

    /// Fetch the feed's current entries in document order.
    /// Errors mean "feed unavailable this run", never "abort the run".
    async fn pull(&self) -> Result<Vec<RawEntry>>;
}

/// Trait for the outbound notification endpoint
#[async_trait]
pub trait NotifySink: Send + Sync {
    /// Human-readable name used in logs
    fn sink_name(&self) -> String;

    /// Post one message. Expected HTTP conditions (rate limits, rejections,
    /// network failures) come back as an outcome, not an error.
    async fn send(&self, message: &WebhookMessage) -> SinkOutcome;
}
