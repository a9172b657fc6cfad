/// A feed the relay polls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveSourceSpec {
    pub uri: String,
    /// Pre-filtered source: every fresh entry is relevant.
    pub trusted: bool,
    /// Overrides the run-wide per-feed entry limit for this source.
    pub entry_limit: Option<usize>,
}

impl LiveSourceSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            trusted: false,
            entry_limit: None,
        }
    }

    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub fn with_entry_limit(mut self, limit: usize) -> Self {
        self.entry_limit = Some(limit);
        self
    }
}

/// One item exactly as a feed source handed it over.
///
/// Every field is optional and timestamps are unparsed text: feeds in the
/// wild omit or mangle any of them. Consumers are expected to normalize
/// eagerly and never pass this type further than the first stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub summary: Option<String>,
}

// Object style note:
// Sources and sinks are driven by short lived, single run processes
// (a cron tick or a CI job). Nothing here should assume it survives
// past one run; durable state belongs to the dedup store alone.
