use anyhow::{bail, Context};
use clap::Parser;
use rss_notifier::cli::Cli;
use rss_notifier::store::DedupSnapshot;
use rss_notifier::{
    DedupStore, DiscordWebhook, DryRunSink, FeedSource, FetchConfig, Fetcher, FileDedupStore, MemoryBacking,
    MemoryDedupStore, Notifier, NotifySink, Pipeline, RssFeedSource, SinkConfig, SinkOutcome, SqliteDedupStore,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let profile = cli.resolve_profile().await.context("Failed to resolve profile")?;
    let config = profile.run_config(&cli.overrides()).context("Invalid run configuration")?;
    config.validate().context("Invalid run configuration")?;

    info!(
        "Starting rss-notifier with profile {} ({} feeds, up to {} posts)",
        profile.name,
        config.feeds.len(),
        config.max_posts_per_run
    );

    // Sink first: a missing webhook must stop us before any fetch.
    let sink: Box<dyn NotifySink> = if cli.dry_run {
        Box::new(DryRunSink)
    } else {
        let sink_config = SinkConfig::new(cli.webhook.clone(), profile.format.clone())?;
        Box::new(DiscordWebhook::new(sink_config.webhook_url)?)
    };
    let notifier = Notifier::new(sink, profile.format.clone());

    let fetcher = Arc::new(Fetcher::new(FetchConfig::default()).context("Failed to build HTTP client")?);
    let sources: Vec<Box<dyn FeedSource>> = config
        .feeds
        .iter()
        .map(|spec| Box::new(RssFeedSource::new(spec.clone(), Arc::clone(&fetcher))) as Box<dyn FeedSource>)
        .collect();

    let mode = config.store_mode();
    let pipeline = Pipeline::new(config, sources, notifier)?;

    if cli.force_test {
        warn!("Test mode: sending one synthetic post, nothing is recorded");
        return match pipeline.send_test_post().await {
            SinkOutcome::Delivered => {
                info!("Test post delivered");
                Ok(())
            }
            other => bail!("Test post was not delivered: {:?}", other),
        };
    }

    let mut store: Box<dyn DedupStore> = if cli.dry_run {
        // Read the real history so the preview matches a live run, but never write it.
        let file = FileDedupStore::open(&cli.cache_path, mode).await?;
        let ids: Vec<String> = ids_of(file.snapshot());
        Box::new(MemoryDedupStore::open(MemoryBacking::with_ids(ids), mode))
    } else if let Some(url) = &cli.store_url {
        Box::new(
            SqliteDedupStore::open(url, mode)
                .await
                .with_context(|| format!("Failed to open store {}", url))?,
        )
    } else {
        Box::new(
            FileDedupStore::open(&cli.cache_path, mode)
                .await
                .with_context(|| format!("Failed to open cache {}", cli.cache_path.display()))?,
        )
    };
    info!("Dedup store: {} ({} ids)", store.backend_name(), store.len());

    let report = pipeline.run(store.as_mut()).await.context("Run failed")?;

    if report.quiet_hours {
        return Ok(());
    }

    info!(
        "Run {} done: {} delivered, {} failed, {} duplicates, {} pending",
        report.run_id,
        report.delivered(),
        report.failed(),
        report.duplicates(),
        report.pending()
    );

    if !report.is_success() {
        if let Some(reason) = &report.delivery.abort_reason {
            error!("Run aborted: {}", reason);
        }
        bail!(
            "{} deliveries failed{}",
            report.failed(),
            if report.aborted() { ", run aborted" } else { "" }
        );
    }

    Ok(())
}

fn ids_of(snapshot: &DedupSnapshot) -> Vec<String> {
    snapshot.ids().map(str::to_string).collect()
}
