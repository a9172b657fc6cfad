use crate::config::RunConfig;
use crate::filter::{FilterDecision, RelevanceFilter, TrustedSource};
use crate::freshness::FreshnessGate;
use crate::normalizer::Normalizer;
use crate::notifier::{Notifier, SinkOutcome};
use crate::scheduler::{DeliveryReport, DeliveryScheduler};
use crate::store::DedupStore;
use crate::traits::FeedSource;
use crate::types::{Candidate, FeedEntry, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Counters and per-entry outcomes of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// The run fell inside quiet hours and did nothing.
    pub quiet_hours: bool,
    pub feeds_failed: usize,
    pub fetched: usize,
    /// Dropped by the normalizer (no title, link or timestamp).
    pub rejected: usize,
    pub filtered_out: usize,
    pub stale: usize,
    /// Same id seen in more than one feed this run.
    pub repeated: usize,
    pub delivery: DeliveryReport,
}

impl RunReport {
    fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            quiet_hours: false,
            feeds_failed: 0,
            fetched: 0,
            rejected: 0,
            filtered_out: 0,
            stale: 0,
            repeated: 0,
            delivery: DeliveryReport::default(),
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivery.delivered()
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivery.delivered_ids()
    }

    pub fn duplicates(&self) -> usize {
        self.repeated + self.delivery.duplicates()
    }

    pub fn failed(&self) -> usize {
        self.delivery.failed()
    }

    pub fn pending(&self) -> usize {
        self.delivery.pending()
    }

    pub fn aborted(&self) -> bool {
        self.delivery.aborted
    }

    /// False when a delivery failed for good or the run was aborted; the
    /// binary turns this into a non-zero exit so someone notices.
    pub fn is_success(&self) -> bool {
        !self.delivery.aborted && self.delivery.failed() == 0
    }
}

/// feed sources -> normalize -> filter -> freshness -> newest first ->
/// dedup -> capped, paced delivery -> commit.
pub struct Pipeline {
    config: RunConfig,
    sources: Vec<Box<dyn FeedSource>>,
    notifier: Notifier,
    filter: Box<dyn RelevanceFilter>,
    normalizer: Normalizer,
    freshness: FreshnessGate,
}

impl Pipeline {
    pub fn new(config: RunConfig, sources: Vec<Box<dyn FeedSource>>, notifier: Notifier) -> Result<Self> {
        config.validate()?;
        let filter = config.filter.build()?;
        let normalizer = Normalizer::new(config.id_key);
        let freshness = FreshnessGate::new(config.lookback_window);

        info!(
            "Pipeline ready: {} sources, filter {}, sink {}",
            sources.len(),
            filter.filter_name(),
            notifier.sink_name()
        );

        Ok(Self {
            config,
            sources,
            notifier,
            filter,
            normalizer,
            freshness,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, store: &mut dyn DedupStore) -> Result<RunReport> {
        self.run_at(store, Utc::now()).await
    }

    /// Run once as if the current time were `now`.
    pub async fn run_at(&self, store: &mut dyn DedupStore, now: DateTime<Utc>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.execute(store, now, run_id).instrument(span).await
    }

    async fn execute(&self, store: &mut dyn DedupStore, now: DateTime<Utc>, run_id: Uuid) -> Result<RunReport> {
        let mut report = RunReport::new(run_id, now);

        if let Some(quiet) = &self.config.quiet_hours {
            if quiet.is_quiet(now)? {
                info!("Quiet hours in {}, skipping run", quiet.timezone);
                report.quiet_hours = true;
                return Ok(report);
            }
        }

        info!("Starting run with {} delivered ids on record", store.len());

        let candidates = self.collect_candidates(now, &mut report).await;
        info!(
            "{} candidates from {} entries ({} rejected, {} filtered out, {} stale, {} repeated)",
            candidates.len(),
            report.fetched,
            report.rejected,
            report.filtered_out,
            report.stale,
            report.repeated
        );

        let scheduler = DeliveryScheduler::new(
            self.config.max_posts_per_run,
            self.config.pace_between_posts,
            self.config.retry.clone(),
        )
        .with_flush_each(self.config.flush_each);

        report.delivery = scheduler.deliver(candidates, store, &self.notifier).await?;

        info!(
            "Run finished: {} delivered, {} store size",
            report.delivered(),
            store.len()
        );
        Ok(report)
    }

    /// Pull every source and reduce the entries to fresh, relevant,
    /// distinct candidates sorted newest first.
    async fn collect_candidates(&self, now: DateTime<Utc>, report: &mut RunReport) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut seen_this_run = HashSet::new();

        for source in &self.sources {
            let spec = source.spec();
            let raw_entries = match source.pull().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping feed {}: {}", spec.uri, e);
                    report.feeds_failed += 1;
                    continue;
                }
            };

            let limit = self.config.entry_limit_for(spec);
            for raw in raw_entries.iter().take(limit) {
                report.fetched += 1;

                let Some(entry) = self.normalizer.normalize(raw, &spec.uri) else {
                    report.rejected += 1;
                    continue;
                };

                let decision = if spec.trusted {
                    TrustedSource.evaluate(&entry)
                } else {
                    self.filter.evaluate(&entry)
                };
                let tag = match decision {
                    FilterDecision::Accept { tag } => tag,
                    FilterDecision::Blocked { term } => {
                        debug!("Blocked by {:?}: {}", term, entry.title);
                        report.filtered_out += 1;
                        continue;
                    }
                    FilterDecision::NoMatch => {
                        debug!("Not relevant: {}", entry.title);
                        report.filtered_out += 1;
                        continue;
                    }
                };

                if !self.freshness.is_fresh(&entry, now) {
                    debug!("Stale ({}): {}", entry.published_at, entry.title);
                    report.stale += 1;
                    continue;
                }

                if !seen_this_run.insert(entry.id.clone()) {
                    report.repeated += 1;
                    continue;
                }

                candidates.push(Candidate::new(entry).with_tag(tag));
            }
        }

        // Stable: entries with equal timestamps keep feed order.
        candidates.sort_by(|a, b| b.entry.published_at.cmp(&a.entry.published_at));
        candidates
    }

    /// Post one synthetic entry to check the sink wiring. Nothing is
    /// recorded in the dedup store.
    pub async fn send_test_post(&self) -> SinkOutcome {
        let entry = FeedEntry {
            id: format!("test-post-{}", Uuid::new_v4()),
            title: "Test post from rss-notifier".to_string(),
            link: "https://example.com/rss-notifier/test-post".to_string(),
            published_at: Utc::now(),
            summary: "Example Corp (Filer) - connectivity check".to_string(),
            source_url: "test".to_string(),
        };
        let candidate = Candidate::new(entry).with_tag(Some("TEST".to_string()));

        info!("Sending test post via {}", self.notifier.sink_name());
        self.notifier.notify(&candidate).await
    }
}
