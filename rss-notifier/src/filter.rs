use crate::types::{FeedEntry, RelayError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of running an entry through a relevance filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accept { tag: Option<String> },
    Blocked { term: String },
    NoMatch,
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterDecision::Accept { .. })
    }
}

/// Positive match from a filter, optionally naming what matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    pub tag: Option<String>,
}

/// Relevance predicate, split in two phases so that block rules of every
/// strategy are consulted before any allow rule.
pub trait RelevanceFilter: Send + Sync {
    fn filter_name(&self) -> String;

    /// The block term that rejects this entry, if any.
    fn blocked(&self, _entry: &FeedEntry) -> Option<String> {
        None
    }

    fn admit(&self, entry: &FeedEntry) -> Option<Admission>;

    fn evaluate(&self, entry: &FeedEntry) -> FilterDecision {
        if let Some(term) = self.blocked(entry) {
            return FilterDecision::Blocked { term };
        }
        match self.admit(entry) {
            Some(admission) => FilterDecision::Accept { tag: admission.tag },
            None => FilterDecision::NoMatch,
        }
    }
}

/// Which entry text keyword rules look at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFields {
    #[default]
    TitleAndSummary,
    Title,
}

struct Term {
    keyword: String,
    pattern: Option<Regex>,
}

impl Term {
    fn new(keyword: &str, word_boundary: bool) -> Result<Self> {
        let keyword = keyword.trim().to_lowercase();
        let pattern = if word_boundary {
            let built = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&keyword)))
                .case_insensitive(true)
                .build()
                .map_err(|e| RelayError::Config(format!("bad keyword {:?}: {}", keyword, e)))?;
            Some(built)
        } else {
            None
        };
        Ok(Self { keyword, pattern })
    }

    /// `text` must already be lower-cased.
    fn matches(&self, text: &str) -> bool {
        match &self.pattern {
            Some(pattern) => pattern.is_match(text),
            None => text.contains(&self.keyword),
        }
    }
}

/// Allow/block keyword lists, case-insensitive.
pub struct KeywordFilter {
    allow: Vec<Term>,
    block: Vec<Term>,
    fields: MatchFields,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(allow: &[S], block: &[S], word_boundary: bool, fields: MatchFields) -> Result<Self> {
        let build = |terms: &[S]| -> Result<Vec<Term>> {
            terms
                .iter()
                .map(|t| t.as_ref())
                .filter(|t| !t.trim().is_empty())
                .map(|t| Term::new(t, word_boundary))
                .collect()
        };

        Ok(Self {
            allow: build(allow)?,
            block: build(block)?,
            fields,
        })
    }

    fn text(&self, entry: &FeedEntry) -> String {
        match self.fields {
            MatchFields::TitleAndSummary => format!("{} {}", entry.title, entry.summary).to_lowercase(),
            MatchFields::Title => entry.title.to_lowercase(),
        }
    }
}

impl RelevanceFilter for KeywordFilter {
    fn filter_name(&self) -> String {
        format!("keywords({} allow, {} block)", self.allow.len(), self.block.len())
    }

    fn blocked(&self, entry: &FeedEntry) -> Option<String> {
        let text = self.text(entry);
        self.block.iter().find(|t| t.matches(&text)).map(|t| t.keyword.clone())
    }

    fn admit(&self, entry: &FeedEntry) -> Option<Admission> {
        let text = self.text(entry);
        self.allow.iter().find(|t| t.matches(&text)).map(|t| Admission {
            tag: Some(t.keyword.clone()),
        })
    }
}

/// Matches title tokens against a fixed set of ticker symbols.
pub struct TickerFilter {
    tickers: HashSet<String>,
}

impl TickerFilter {
    pub fn new<S: AsRef<str>>(tickers: &[S]) -> Self {
        Self {
            tickers: tickers.iter().map(|t| t.as_ref().trim().to_uppercase()).collect(),
        }
    }

    /// First title token that is a known ticker, e.g. `NVDA` in
    /// "8-K - NVIDIA CORP (NVDA) (Filer)".
    pub fn find_ticker(&self, title: &str) -> Option<String> {
        let cleaned: String = title.chars().filter(|c| !matches!(c, ',' | '(' | ')')).collect();
        cleaned
            .split_whitespace()
            .map(str::to_uppercase)
            .find(|token| self.tickers.contains(token))
    }
}

impl RelevanceFilter for TickerFilter {
    fn filter_name(&self) -> String {
        format!("tickers({})", self.tickers.len())
    }

    fn admit(&self, entry: &FeedEntry) -> Option<Admission> {
        self.find_ticker(&entry.title).map(|ticker| Admission { tag: Some(ticker) })
    }
}

/// Pass-through for pre-filtered sources.
pub struct TrustedSource;

impl RelevanceFilter for TrustedSource {
    fn filter_name(&self) -> String {
        "trusted".to_string()
    }

    fn admit(&self, _entry: &FeedEntry) -> Option<Admission> {
        Some(Admission::default())
    }
}

/// Conjunction: every member must admit, no member may block.
pub struct AllOf {
    filters: Vec<Box<dyn RelevanceFilter>>,
}

impl AllOf {
    pub fn new(filters: Vec<Box<dyn RelevanceFilter>>) -> Self {
        Self { filters }
    }
}

impl RelevanceFilter for AllOf {
    fn filter_name(&self) -> String {
        let names: Vec<String> = self.filters.iter().map(|f| f.filter_name()).collect();
        format!("all_of[{}]", names.join(", "))
    }

    fn blocked(&self, entry: &FeedEntry) -> Option<String> {
        self.filters.iter().find_map(|f| f.blocked(entry))
    }

    fn admit(&self, entry: &FeedEntry) -> Option<Admission> {
        if self.filters.is_empty() {
            return None;
        }
        let mut tag = None;
        for filter in &self.filters {
            let admission = filter.admit(entry)?;
            if tag.is_none() {
                tag = admission.tag;
            }
        }
        Some(Admission { tag })
    }
}

/// Serializable description of the active relevance filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    Keywords {
        allow: Vec<String>,
        #[serde(default)]
        block: Vec<String>,
        #[serde(default)]
        word_boundary: bool,
        #[serde(default)]
        fields: MatchFields,
    },
    Tickers {
        tickers: Vec<String>,
    },
    AcceptAll,
    AllOf {
        filters: Vec<FilterSpec>,
    },
}

impl FilterSpec {
    pub fn keywords(allow: &[&str], block: &[&str]) -> Self {
        FilterSpec::Keywords {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            block: block.iter().map(|s| s.to_string()).collect(),
            word_boundary: false,
            fields: MatchFields::TitleAndSummary,
        }
    }

    pub fn tickers(tickers: &[&str]) -> Self {
        FilterSpec::Tickers {
            tickers: tickers.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            FilterSpec::Keywords { allow, .. } if allow.iter().all(|a| a.trim().is_empty()) => {
                Err(RelayError::Config("keyword filter has an empty allow list".to_string()))
            }
            FilterSpec::Tickers { tickers } if tickers.is_empty() => {
                Err(RelayError::Config("ticker filter has no tickers".to_string()))
            }
            FilterSpec::AllOf { filters } if filters.is_empty() => {
                Err(RelayError::Config("all_of filter has no members".to_string()))
            }
            FilterSpec::AllOf { filters } => filters.iter().try_for_each(FilterSpec::validate),
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Result<Box<dyn RelevanceFilter>> {
        Ok(match self {
            FilterSpec::Keywords {
                allow,
                block,
                word_boundary,
                fields,
            } => Box::new(KeywordFilter::new(allow, block, *word_boundary, *fields)?),
            FilterSpec::Tickers { tickers } => Box::new(TickerFilter::new(tickers)),
            FilterSpec::AcceptAll => Box::new(TrustedSource),
            FilterSpec::AllOf { filters } => {
                let built = filters.iter().map(FilterSpec::build).collect::<Result<Vec<_>>>()?;
                Box::new(AllOf::new(built))
            }
        })
    }
}
