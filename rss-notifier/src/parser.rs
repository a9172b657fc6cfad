use crate::types::{RawEntry, RelayError, Result};
use feed_rs::parser;
use tracing::debug;

pub struct FeedParser;

impl FeedParser {
    /// Parse an RSS, Atom or JSON feed document into raw entries, in
    /// document order.
    pub fn parse(content: &str) -> Result<Vec<RawEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| RelayError::Parse(format!("Failed to parse feed: {}", e)))?;

        let entries: Vec<RawEntry> = feed.entries.into_iter().map(Self::raw_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn raw_entry(entry: feed_rs::model::Entry) -> RawEntry {
        // feed-rs synthesizes an id when the document has none, so an empty
        // id only happens for truly odd input.
        let id = Some(entry.id).filter(|id| !id.trim().is_empty());

        // Prefer the alternate link; Atom feeds often list `self`/`edit` first.
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        // Some feeds only carry a body, no summary.
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body));

        RawEntry {
            id,
            title: entry.title.map(|t| t.content),
            link,
            published: entry.published.map(|dt| dt.to_rfc3339()),
            updated: entry.updated.map(|dt| dt.to_rfc3339()),
            summary,
        }
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel")
            || content_lower.contains("\"https://jsonfeed.org/version/");

        has_feed_indicators
    }
}
