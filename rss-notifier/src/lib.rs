pub mod types;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod sources;
pub mod normalizer;
pub mod filter;
pub mod freshness;
pub mod store;
pub mod retry;
pub mod notifier;
pub mod scheduler;
pub mod pipeline;
pub mod config;
pub mod presets;
pub mod cli;
pub mod rss_utils;

pub use types::*;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use traits::{FeedSource, NotifySink};
pub use sources::RssFeedSource;
pub use normalizer::{IdentifierKey, Normalizer};
pub use filter::{FilterDecision, FilterSpec, RelevanceFilter};
pub use freshness::FreshnessGate;
pub use store::{DedupMode, DedupStore, FileDedupStore, MemoryBacking, MemoryDedupStore, Seen, SqliteDedupStore};
pub use retry::RetryPolicy;
pub use notifier::{DiscordWebhook, DryRunSink, MessageFormat, Notifier, SinkOutcome, WebhookMessage};
pub use scheduler::{DeliveryReport, DeliveryScheduler, EntryState};
pub use pipeline::{Pipeline, RunReport};
pub use config::{Profile, RunConfig, SinkConfig};
