use std::sync::Arc;
use std::time::Duration;

use feedpost::admin::AdminOps;
use feedpost::bot;
use feedpost::config::Config;
use feedpost::db::Repository;
use feedpost::error::Result;
use feedpost::feed::{FeedFetcher, FetchFeeds};
use feedpost::pipeline::DeliveryPipeline;
use feedpost::scheduler::{Scheduler, TickOutcome};
use feedpost::services::{TelegramClient, Translator};
use feedpost::transport::{ChatTransport, LogTransport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry" || a == "-d");
    let force_run = args.iter().any(|a| a == "--force" || a == "-f");
    let no_translate = args.iter().any(|a| a == "--notr" || a == "-n");
    tracing::info!(
        "Starting feedpost (dry: {}, force: {}, no-translate: {})",
        dry_run,
        force_run,
        no_translate
    );

    let config = Config::load()?;

    let repo = Repository::new(&config.db_path).await?;
    tracing::info!(
        "Store ready: {} feeds, {} delivery records",
        repo.count_feeds().await?,
        repo.count_fingerprints().await?
    );

    let fetcher = Arc::new(FeedFetcher::new(Duration::from_secs(
        config.fetch_timeout_secs,
    )));

    let translator = if no_translate {
        None
    } else {
        config
            .translate_api_url
            .clone()
            .map(|url| Translator::new(url, config.translate_api_key.clone()))
    };

    // Dry-run swaps the Telegram transport for a logging one
    let telegram = if dry_run {
        None
    } else {
        let token = config.resolve_bot_token()?;
        Some(Arc::new(TelegramClient::new(&token, config.target_chat)))
    };
    let transport: Arc<dyn ChatTransport> = match &telegram {
        Some(client) => Arc::clone(client) as Arc<dyn ChatTransport>,
        None => Arc::new(LogTransport),
    };

    let pipeline = DeliveryPipeline::new(
        repo.clone(),
        Arc::clone(&fetcher) as Arc<dyn FetchFeeds>,
        Arc::clone(&transport),
        translator,
        config.translate_languages.clone(),
        config.news_count as usize,
        config.max_news_age_days,
        dry_run,
    );

    let scheduler = Scheduler::new(
        pipeline,
        repo.clone(),
        config.post_interval_minutes,
        config.max_news_age_days,
    );
    let handle = scheduler.handle();

    // One-shot modes: run a single tick and exit
    if force_run || dry_run {
        match handle.force().await? {
            TickOutcome::Ran(summary) => tracing::info!(
                "Done: {} delivered, {} feeds failed",
                summary.delivered,
                summary.feeds_failed
            ),
            TickOutcome::Skipped => unreachable!("no concurrent tick in one-shot mode"),
        }
        return Ok(());
    }

    let telegram = telegram.expect("telegram client exists outside dry-run");

    let ops = AdminOps::new(
        repo,
        fetcher,
        handle,
        transport,
        config.max_news_age_days,
    );

    tokio::spawn(scheduler.run());
    bot::run(telegram, config.admin_chat, ops).await;

    Ok(())
}
