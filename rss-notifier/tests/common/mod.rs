#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rss_notifier::config::RunConfig;
use rss_notifier::{
    FeedSource, FilterSpec, LiveSourceSpec, MessageFormat, Notifier, NotifySink, RawEntry, RelayError, Result,
    SinkOutcome, WebhookMessage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use tokio::time::Instant;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Monday 2025-03-10 15:00 UTC, late morning in New York.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    fixed_now() - Duration::hours(hours)
}

pub fn raw_entry(title: &str, link: &str, published: DateTime<Utc>) -> RawEntry {
    RawEntry {
        id: Some(format!("tag:{}", link)),
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        published: Some(published.to_rfc3339()),
        updated: None,
        summary: None,
    }
}

pub fn article(n: usize, published: DateTime<Utc>) -> RawEntry {
    raw_entry(
        &format!("Ethereum update {}", n),
        &format!("https://news.example.com/articles/{}", n),
        published,
    )
}

pub fn link_of(n: usize) -> String {
    format!("https://news.example.com/articles/{}", n)
}

/// Feed source that returns canned entries, or fails.
pub struct StaticSource {
    spec: LiveSourceSpec,
    entries: Option<Vec<RawEntry>>,
}

impl StaticSource {
    pub fn new(uri: &str, entries: Vec<RawEntry>) -> Self {
        Self {
            spec: LiveSourceSpec::new(uri),
            entries: Some(entries),
        }
    }

    pub fn failing(uri: &str) -> Self {
        Self {
            spec: LiveSourceSpec::new(uri),
            entries: None,
        }
    }

    pub fn trusted(mut self) -> Self {
        self.spec = self.spec.trusted();
        self
    }

    pub fn spec_clone(&self) -> LiveSourceSpec {
        self.spec.clone()
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    fn spec(&self) -> &LiveSourceSpec {
        &self.spec
    }

    async fn pull(&self) -> Result<Vec<RawEntry>> {
        match &self.entries {
            Some(entries) => Ok(entries.clone()),
            None => Err(RelayError::Parse(format!("{} is unreachable", self.spec.uri))),
        }
    }
}

#[derive(Default)]
struct SinkState {
    script: VecDeque<SinkOutcome>,
    sent: Vec<(WebhookMessage, Instant)>,
}

/// Sink that replays scripted outcomes (then `Delivered`) and records
/// every call. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedSink {
    state: Arc<Mutex<SinkState>>,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(outcomes: Vec<SinkOutcome>) -> Self {
        let sink = Self::default();
        sink.state.lock().unwrap().script = outcomes.into();
        sink
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn messages(&self) -> Vec<WebhookMessage> {
        self.state.lock().unwrap().sent.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().sent.iter().map(|(_, t)| *t).collect()
    }

    /// Contents of every message that was sent, in order.
    pub fn contents(&self) -> Vec<String> {
        self.messages().into_iter().filter_map(|m| m.content).collect()
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(Box::new(self.clone()), MessageFormat::Headline)
    }
}

#[async_trait]
impl NotifySink for ScriptedSink {
    fn sink_name(&self) -> String {
        "scripted".to_string()
    }

    async fn send(&self, message: &WebhookMessage) -> SinkOutcome {
        let mut state = self.state.lock().unwrap();
        state.sent.push((message.clone(), Instant::now()));
        state.script.pop_front().unwrap_or(SinkOutcome::Delivered)
    }
}

pub fn rate_limited(secs: u64) -> SinkOutcome {
    SinkOutcome::RateLimited {
        retry_after: std::time::Duration::from_secs(secs),
    }
}

pub fn server_error() -> SinkOutcome {
    SinkOutcome::Failed {
        status: Some(502),
        reason: "bad gateway".to_string(),
        retryable: true,
    }
}

/// Config over the given sources with no pacing and an accept-all filter.
pub fn config_for(sources: &[&StaticSource]) -> RunConfig {
    let mut config = RunConfig::new(sources.iter().map(|s| s.spec_clone()).collect(), FilterSpec::AcceptAll);
    config.pace_between_posts = std::time::Duration::ZERO;
    config
}

pub fn boxed(sources: Vec<StaticSource>) -> Vec<Box<dyn FeedSource>> {
    sources.into_iter().map(|s| Box::new(s) as Box<dyn FeedSource>).collect()
}
