use crate::notifier::{Notifier, SinkOutcome};
use crate::retry::RetryPolicy;
use crate::store::{DedupStore, Seen};
use crate::types::{Candidate, Result};
use backoff::backoff::Backoff;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where a candidate ended up after the delivery loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Already in the dedup store (or behind the cursor).
    Duplicate,
    Delivered,
    /// Retries exhausted or the sink refused it. Not recorded, so the next
    /// run will try again.
    FailedPermanently { reason: String },
    /// Never attempted: the per-run cap was reached or the run aborted.
    Pending,
}

#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub state: EntryState,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<EntryOutcome>,
    pub aborted: bool,
    pub abort_reason: Option<String>,
    /// Ids written to the dedup store by this run.
    pub flushed: usize,
}

impl DeliveryReport {
    pub fn count(&self, predicate: impl Fn(&EntryState) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.state)).count()
    }

    pub fn delivered(&self) -> usize {
        self.count(|s| *s == EntryState::Delivered)
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.state == EntryState::Delivered)
            .map(|o| o.id.clone())
            .collect()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EntryState::FailedPermanently { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|s| *s == EntryState::Duplicate)
    }

    pub fn pending(&self) -> usize {
        self.count(|s| *s == EntryState::Pending)
    }
}

enum Attempt {
    Delivered { attempts: u32 },
    Failed { reason: String, attempts: u32 },
    /// Give up on this item and everything after it.
    Abort { reason: String, attempts: u32 },
}

/// Sequential, capped, paced delivery of candidates (newest first).
pub struct DeliveryScheduler {
    max_posts: usize,
    pace: Duration,
    retry: RetryPolicy,
    flush_each: bool,
}

impl DeliveryScheduler {
    pub fn new(max_posts: usize, pace: Duration, retry: RetryPolicy) -> Self {
        Self {
            max_posts,
            pace,
            retry,
            flush_each: false,
        }
    }

    /// Flush the store after every delivery instead of once per run.
    pub fn with_flush_each(mut self, flush_each: bool) -> Self {
        self.flush_each = flush_each;
        self
    }

    /// Deliver `candidates` in order. Only delivered ids are staged; the store
    /// is flushed when at least one delivery succeeded and left untouched
    /// otherwise. A flush failure is returned as an error.
    pub async fn deliver(
        &self,
        candidates: Vec<Candidate>,
        store: &mut dyn DedupStore,
        notifier: &Notifier,
    ) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        let mut delivered = 0usize;
        let mut past_cursor = false;
        let mut pace_next = false;
        store.begin_run();

        for candidate in candidates {
            let entry = &candidate.entry;
            let mut outcome = EntryOutcome {
                id: entry.id.clone(),
                title: entry.title.clone(),
                published_at: entry.published_at,
                state: EntryState::Pending,
                attempts: 0,
            };

            if past_cursor {
                outcome.state = EntryState::Duplicate;
                report.outcomes.push(outcome);
                continue;
            }

            match store.lookup(&entry.id) {
                Seen::Delivered => {
                    debug!("Already delivered: {}", entry.id);
                    outcome.state = EntryState::Duplicate;
                    report.outcomes.push(outcome);
                    continue;
                }
                Seen::Watermark => {
                    debug!("Reached cursor {}, remaining entries are older", entry.id);
                    past_cursor = true;
                    outcome.state = EntryState::Duplicate;
                    report.outcomes.push(outcome);
                    continue;
                }
                Seen::New => {}
            }

            if report.aborted || delivered >= self.max_posts {
                report.outcomes.push(outcome);
                continue;
            }

            if pace_next && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }

            match self.attempt(&candidate, notifier).await {
                Attempt::Delivered { attempts } => {
                    info!("Delivered: {} ({})", entry.title, entry.link);
                    store.stage_commit(entry.id.clone());
                    if self.flush_each {
                        report.flushed += store.flush().await?;
                    }
                    delivered += 1;
                    pace_next = true;
                    outcome.state = EntryState::Delivered;
                    outcome.attempts = attempts;
                }
                Attempt::Failed { reason, attempts } => {
                    error!("Giving up on {} after {} attempts: {}", entry.link, attempts, reason);
                    pace_next = true;
                    outcome.state = EntryState::FailedPermanently { reason };
                    outcome.attempts = attempts;
                }
                Attempt::Abort { reason, attempts } => {
                    error!("Aborting remaining deliveries at {}: {}", entry.link, reason);
                    report.aborted = true;
                    report.abort_reason = Some(reason.clone());
                    outcome.state = EntryState::FailedPermanently { reason };
                    outcome.attempts = attempts;
                }
            }
            report.outcomes.push(outcome);
        }

        if delivered > 0 {
            report.flushed += store.flush().await?;
        }

        info!(
            "Delivery finished: {} delivered, {} failed, {} duplicate, {} pending{}",
            report.delivered(),
            report.failed(),
            report.duplicates(),
            report.pending(),
            if report.aborted { " (aborted)" } else { "" }
        );
        Ok(report)
    }

    async fn attempt(&self, candidate: &Candidate, notifier: &Notifier) -> Attempt {
        let mut backoff = self.retry.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = notifier.notify(candidate).await;

            match outcome {
                SinkOutcome::Delivered => return Attempt::Delivered { attempts },
                SinkOutcome::RateLimited { retry_after } => {
                    if !self.retry.attempts_left(attempts) {
                        return Attempt::Abort {
                            reason: format!("still rate limited after {} attempts", attempts),
                            attempts,
                        };
                    }
                    let Some(delay) = self.retry.rate_limit_delay(retry_after) else {
                        return Attempt::Abort {
                            reason: format!("sink asked to wait {:?}", retry_after),
                            attempts,
                        };
                    };
                    warn!("Rate limited by {}, retrying in {:?}", notifier.sink_name(), delay);
                    tokio::time::sleep(delay).await;
                }
                ref rejected if rejected.is_endpoint_rejection() => {
                    return Attempt::Abort {
                        reason: format!("sink rejected the endpoint: {:?}", rejected),
                        attempts,
                    };
                }
                SinkOutcome::Failed {
                    reason,
                    retryable: true,
                    ..
                } => {
                    if !self.retry.attempts_left(attempts) {
                        return Attempt::Failed { reason, attempts };
                    }
                    let delay = backoff.next_backoff().unwrap_or(self.retry.max_backoff);
                    warn!("Delivery attempt {} failed ({}), retrying in {:?}", attempts, reason, delay);
                    tokio::time::sleep(delay).await;
                }
                SinkOutcome::Failed { status, reason, .. } => {
                    let reason = match status {
                        Some(code) => format!("HTTP {}: {}", code, reason),
                        None => reason,
                    };
                    return Attempt::Failed { reason, attempts };
                }
            }
        }
    }
}
