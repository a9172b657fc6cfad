//! Command line and environment surface of the `rss-notifier` binary.

use crate::config::{DedupModeKind, Overrides, Profile};
use crate::normalizer::IdentifierKey;
use crate::presets::{self, PRESET_NAMES};
use crate::types::{RelayError, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rss-notifier")]
#[command(about = "Relay fresh, relevant feed entries to a Discord webhook")]
#[command(version)]
pub struct Cli {
    /// Webhook endpoint; required unless --dry-run
    #[arg(long, env = "DISCORD_WEBHOOK", hide_env_values = true)]
    pub webhook: Option<String>,

    /// Built-in profile (ethereum-news, ai-infra, tech-watch, crypto-news, edgar-ai, edgar-crypto)
    #[arg(long, env = "PRESET", conflicts_with = "profile")]
    pub preset: Option<String>,

    /// JSON profile file
    #[arg(long, env = "PROFILE")]
    pub profile: Option<PathBuf>,

    #[arg(long, env = "MAX_POSTS_PER_RUN")]
    pub max_posts_per_run: Option<usize>,

    #[arg(long, env = "LOOKBACK_DAYS")]
    pub lookback_days: Option<i64>,

    #[arg(long, env = "PER_FEED_ENTRY_LIMIT")]
    pub per_feed_entry_limit: Option<usize>,

    #[arg(long, env = "CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// Pause between two posts, in milliseconds
    #[arg(long, env = "PACE_MS")]
    pub pace_ms: Option<u64>,

    #[arg(long, env = "MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// bounded | cursor
    #[arg(long, env = "DEDUP_MODE", value_parser = parse_dedup_mode)]
    pub dedup: Option<DedupModeKind>,

    /// link | feed_id
    #[arg(long, env = "ID_KEY", value_parser = parse_id_key)]
    pub id_key: Option<IdentifierKey>,

    /// Delivered-ids file
    #[arg(long, env = "CACHE_PATH", default_value = ".rss-notifier-cache")]
    pub cache_path: PathBuf,

    /// SQLite store, e.g. sqlite://state.db; takes precedence over --cache-path
    #[arg(long, env = "STORE_URL")]
    pub store_url: Option<String>,

    /// Persist the store after every delivery
    #[arg(long, env = "FLUSH_EACH", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub flush_each: bool,

    #[arg(long, env = "IGNORE_QUIET_HOURS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub ignore_quiet_hours: bool,

    /// Send one synthetic post and exit; the store is not touched
    #[arg(long = "test-post", env = "FORCE_TEST", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub force_test: bool,

    /// Log messages instead of posting them
    #[arg(long, env = "DRY_RUN", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_dedup_mode(value: &str) -> std::result::Result<DedupModeKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "bounded" => Ok(DedupModeKind::Bounded),
        "cursor" => Ok(DedupModeKind::Cursor),
        other => Err(format!("unknown dedup mode {:?} (expected bounded or cursor)", other)),
    }
}

fn parse_id_key(value: &str) -> std::result::Result<IdentifierKey, String> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "link" => Ok(IdentifierKey::Link),
        "feed_id" | "id" => Ok(IdentifierKey::FeedId),
        other => Err(format!("unknown identifier key {:?} (expected link or feed_id)", other)),
    }
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            max_posts_per_run: self.max_posts_per_run,
            lookback_days: self.lookback_days,
            per_feed_entry_limit: self.per_feed_entry_limit,
            cache_capacity: self.cache_capacity,
            pace_ms: self.pace_ms,
            max_attempts: self.max_attempts,
            dedup: self.dedup,
            id_key: self.id_key,
            flush_each: self.flush_each,
            ignore_quiet_hours: self.ignore_quiet_hours,
        }
    }

    /// The profile named by --preset, or loaded from --profile.
    pub async fn resolve_profile(&self) -> Result<Profile> {
        match (&self.preset, &self.profile) {
            (Some(name), _) => presets::preset(name).ok_or_else(|| {
                RelayError::Config(format!(
                    "unknown preset {:?}; available: {}",
                    name,
                    PRESET_NAMES.join(", ")
                ))
            }),
            (None, Some(path)) => Profile::load(path).await,
            (None, None) => Err(RelayError::Config(format!(
                "no preset or profile given; available presets: {}",
                PRESET_NAMES.join(", ")
            ))),
        }
    }
}
