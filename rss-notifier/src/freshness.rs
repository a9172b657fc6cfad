use crate::types::FeedEntry;
use chrono::{DateTime, Duration, Utc};

/// Drops entries published before `now - lookback`.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessGate {
    lookback: Duration,
}

impl FreshnessGate {
    pub fn new(lookback: Duration) -> Self {
        Self { lookback }
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Saturates at the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.lookback).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// An entry exactly at the cutoff is still fresh.
    pub fn is_fresh(&self, entry: &FeedEntry, now: DateTime<Utc>) -> bool {
        entry.published_at >= self.cutoff(now)
    }
}
