//! Run configuration: what to poll, how to filter and how hard to push the sink.

use crate::filter::FilterSpec;
use crate::normalizer::IdentifierKey;
use crate::notifier::MessageFormat;
use crate::retry::RetryPolicy;
use crate::rss_utils;
use crate::store::DedupMode;
use crate::types::{LiveSourceSpec, RelayError, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;

pub const DEFAULT_MAX_POSTS_PER_RUN: usize = 3;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
pub const DEFAULT_PER_FEED_ENTRY_LIMIT: usize = 5;
pub const DEFAULT_CACHE_CAPACITY: usize = 500;
pub const DEFAULT_PACE_MS: u64 = 1500;

/// Everything a pipeline run needs. Built once, never mutated during the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub feeds: Vec<LiveSourceSpec>,
    pub lookback_window: Duration,
    pub max_posts_per_run: usize,
    pub per_feed_entry_limit: usize,
    pub cache_capacity: usize,
    pub pace_between_posts: StdDuration,
    pub filter: FilterSpec,
    pub dedup_mode: DedupModeKind,
    pub id_key: IdentifierKey,
    pub retry: RetryPolicy,
    pub flush_each: bool,
    pub quiet_hours: Option<QuietHours>,
}

impl RunConfig {
    pub fn new(feeds: Vec<LiveSourceSpec>, filter: FilterSpec) -> Self {
        Self {
            feeds,
            lookback_window: Duration::days(DEFAULT_LOOKBACK_DAYS),
            max_posts_per_run: DEFAULT_MAX_POSTS_PER_RUN,
            per_feed_entry_limit: DEFAULT_PER_FEED_ENTRY_LIMIT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            pace_between_posts: StdDuration::from_millis(DEFAULT_PACE_MS),
            filter,
            dedup_mode: DedupModeKind::Bounded,
            id_key: IdentifierKey::Link,
            retry: RetryPolicy::default(),
            flush_each: false,
            quiet_hours: None,
        }
    }

    /// Dedup mode with the configured capacity filled in.
    pub fn store_mode(&self) -> DedupMode {
        match self.dedup_mode {
            DedupModeKind::Bounded => DedupMode::Bounded {
                capacity: self.cache_capacity,
            },
            DedupModeKind::Cursor => DedupMode::Cursor,
        }
    }

    pub fn entry_limit_for(&self, feed: &LiveSourceSpec) -> usize {
        feed.entry_limit.unwrap_or(self.per_feed_entry_limit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            return Err(RelayError::Config("no feeds configured".to_string()));
        }
        if let Some(bad) = self.feeds.iter().find(|f| !rss_utils::url::is_valid_feed_url(&f.uri)) {
            return Err(RelayError::Config(format!("invalid feed URL: {}", bad.uri)));
        }
        if self.max_posts_per_run == 0 {
            return Err(RelayError::Config("max posts per run must be at least 1".to_string()));
        }
        if self.per_feed_entry_limit == 0 {
            return Err(RelayError::Config("per-feed entry limit must be at least 1".to_string()));
        }
        if self.dedup_mode == DedupModeKind::Bounded && self.cache_capacity < self.max_posts_per_run {
            return Err(RelayError::Config(format!(
                "cache capacity {} is smaller than max posts per run {}",
                self.cache_capacity, self.max_posts_per_run
            )));
        }
        if self.lookback_window <= Duration::zero() {
            return Err(RelayError::Config("lookback window must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(RelayError::Config("max attempts must be at least 1".to_string()));
        }
        if let Some(quiet) = &self.quiet_hours {
            quiet.validate()?;
        }
        self.filter.validate()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupModeKind {
    #[default]
    Bounded,
    Cursor,
}

/// Where notifications go and what they look like.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub webhook_url: String,
    pub format: MessageFormat,
}

impl SinkConfig {
    /// A missing endpoint is fatal: the run must stop before anything is
    /// fetched or posted.
    pub fn new(webhook_url: Option<String>, format: MessageFormat) -> Result<Self> {
        let webhook_url = webhook_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RelayError::Config("webhook URL is not set".to_string()))?;

        if !rss_utils::url::is_valid_webhook_url(&webhook_url) {
            return Err(RelayError::Config("webhook URL must be an https URL".to_string()));
        }

        Ok(Self { webhook_url, format })
    }
}

/// Local-time window in which nothing is posted, e.g. 19:00 to midnight
/// New York time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub timezone: String,
    pub from_hour: u32,
    #[serde(default = "midnight")]
    pub until_hour: u32,
}

fn midnight() -> u32 {
    24
}

impl QuietHours {
    pub fn evenings(timezone: &str, from_hour: u32) -> Self {
        Self {
            timezone: timezone.to_string(),
            from_hour,
            until_hour: 24,
        }
    }

    fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| RelayError::Config(format!("unknown time zone {:?}: {}", self.timezone, e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.from_hour > 23 || self.until_hour > 24 || self.from_hour == self.until_hour {
            return Err(RelayError::Config(format!(
                "invalid quiet hours {}..{}",
                self.from_hour, self.until_hour
            )));
        }
        Ok(())
    }

    /// Windows may wrap midnight (`from_hour > until_hour`).
    pub fn is_quiet(&self, now: DateTime<Utc>) -> Result<bool> {
        let hour = now.with_timezone(&self.tz()?).hour();
        Ok(if self.from_hour < self.until_hour {
            hour >= self.from_hour && hour < self.until_hour
        } else {
            hour >= self.from_hour || hour < self.until_hour
        })
    }
}

/// Feed catalog plus filtering and formatting choices, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub feeds: Vec<FeedSpec>,
    pub filter: FilterSpec,
    #[serde(default)]
    pub format: MessageFormat,
    #[serde(default)]
    pub dedup: DedupModeKind,
    #[serde(default)]
    pub id_key: IdentifierKey,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
    #[serde(default)]
    pub max_posts_per_run: Option<usize>,
    #[serde(default)]
    pub per_feed_entry_limit: Option<usize>,
    #[serde(default)]
    pub lookback_days: Option<i64>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub url: String,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub entry_limit: Option<usize>,
}

impl From<&FeedSpec> for LiveSourceSpec {
    fn from(feed: &FeedSpec) -> Self {
        Self {
            uri: feed.url.clone(),
            trusted: feed.trusted,
            entry_limit: feed.entry_limit,
        }
    }
}

/// Overrides from the command line or environment; `None` defers to the
/// profile, then to the documented default.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_posts_per_run: Option<usize>,
    pub lookback_days: Option<i64>,
    pub per_feed_entry_limit: Option<usize>,
    pub cache_capacity: Option<usize>,
    pub pace_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub dedup: Option<DedupModeKind>,
    pub id_key: Option<IdentifierKey>,
    pub flush_each: bool,
    pub ignore_quiet_hours: bool,
}

impl Profile {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn run_config(&self, overrides: &Overrides) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.feeds.iter().map(LiveSourceSpec::from).collect(), self.filter.clone());

        config.max_posts_per_run = overrides
            .max_posts_per_run
            .or(self.max_posts_per_run)
            .unwrap_or(DEFAULT_MAX_POSTS_PER_RUN);
        let lookback_days = overrides
            .lookback_days
            .or(self.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS);
        config.lookback_window = Duration::try_days(lookback_days)
            .ok_or_else(|| RelayError::Config(format!("lookback of {} days is out of range", lookback_days)))?;
        config.per_feed_entry_limit = overrides
            .per_feed_entry_limit
            .or(self.per_feed_entry_limit)
            .unwrap_or(DEFAULT_PER_FEED_ENTRY_LIMIT);
        config.cache_capacity = overrides.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
        config.pace_between_posts = StdDuration::from_millis(overrides.pace_ms.unwrap_or(DEFAULT_PACE_MS));
        config.dedup_mode = overrides.dedup.unwrap_or(self.dedup);
        config.id_key = overrides.id_key.unwrap_or(self.id_key);
        config.retry = self.retry.clone().unwrap_or_default();
        if let Some(max_attempts) = overrides.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        config.flush_each = overrides.flush_each;
        config.quiet_hours = if overrides.ignore_quiet_hours {
            None
        } else {
            self.quiet_hours.clone()
        };

        Ok(config)
    }
}
