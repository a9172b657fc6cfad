use crate::types::{FeedEntry, RawEntry};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which field identifies an entry in the dedup store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKey {
    /// The entry's link (stable across feeds that syndicate the same story).
    #[default]
    Link,
    /// The feed-provided id/guid, falling back to the link when absent.
    FeedId,
}

/// Turns raw feed items into `FeedEntry` records, dropping unusable ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    key: IdentifierKey,
}

impl Normalizer {
    pub fn new(key: IdentifierKey) -> Self {
        Self { key }
    }

    /// Returns `None` when the item has no title, no link, or no parseable
    /// published/updated timestamp. That is routine for sloppy feeds.
    pub fn normalize(&self, raw: &RawEntry, source_url: &str) -> Option<FeedEntry> {
        let title = non_blank(raw.title.as_deref())?;
        let Some(link) = non_blank(raw.link.as_deref()) else {
            debug!("Dropping entry without link: {}", title);
            return None;
        };

        let published_at = raw
            .published
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| raw.updated.as_deref().and_then(parse_timestamp));
        let Some(published_at) = published_at else {
            debug!("Dropping entry without usable timestamp: {}", link);
            return None;
        };

        let id = match self.key {
            IdentifierKey::Link => link.clone(),
            IdentifierKey::FeedId => non_blank(raw.id.as_deref()).unwrap_or_else(|| link.clone()),
        };

        Some(FeedEntry {
            id,
            title,
            link,
            published_at,
            summary: raw.summary.as_deref().map(str::trim).unwrap_or_default().to_string(),
            source_url: source_url.to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse the timestamp shapes feeds actually emit: RFC 3339, RFC 2822, and
/// zone-less ISO-ish dates (taken as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
