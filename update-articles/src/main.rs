use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use update_articles::{
    ArticleStore, ArticleUpdater, ConfigReport, Enricher, GroqAdapter, PgArticleStore,
    RssFeedSource, UpdateSettings, UpdaterConfig, UpdaterError,
};

#[derive(Parser, Debug)]
#[command(name = "update-articles", about = "Fetch, translate and store Azure update articles")]
struct Cli {
    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log filter (e.g. info, debug, update_articles=trace). Defaults to LOG_LEVEL or info
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single update (default)
    Run {
        /// Maximum items to process; 0 means no limit. Defaults to UPDATE_LIMIT
        limit: Option<usize>,
    },
    /// Run updates on a fixed schedule until interrupted
    Watch {
        limit: Option<usize>,
        #[arg(long, default_value_t = 60)]
        interval_minutes: u64,
    },
    /// Print stored articles, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        "debug".to_string()
    } else {
        cli.log_level
            .clone()
            .or_else(|| std::env::var("LOG_LEVEL").ok())
            .unwrap_or_else(|| "info".to_string())
    };

    let filter = EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Command::Run { limit: None }) {
        Command::Run { limit } => {
            let (config, store) = load().await?;
            let updater = build_updater(&config, store)?;
            let summary = updater.run_update(limit.unwrap_or(config.update_limit)).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Watch {
            limit,
            interval_minutes,
        } => {
            let (config, store) = load().await?;
            let updater = build_updater(&config, store)?;
            watch(&updater, limit.unwrap_or(config.update_limit), interval_minutes).await;
        }
        Command::List { limit } => {
            let store = open_store(&UpdaterConfig::database_url_from_env()?).await?;
            let mut articles = store.query_all().await?;
            if let Some(limit) = limit {
                articles.truncate(limit);
            }
            let listing = serde_json::json!({
                "lastUpdated": Utc::now(),
                "articles": articles,
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }

    Ok(())
}

async fn load() -> Result<(UpdaterConfig, Arc<PgArticleStore>)> {
    let config = UpdaterConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);
    let store = open_store(&config.database_url).await?;
    Ok((config, store))
}

async fn open_store(database_url: &str) -> Result<Arc<PgArticleStore>> {
    let store = PgArticleStore::connect(database_url)
        .await
        .context("Failed to connect to the article database")?;
    store.setup_schema().await?;
    Ok(Arc::new(store))
}

fn build_updater(config: &UpdaterConfig, store: Arc<PgArticleStore>) -> Result<ArticleUpdater> {
    let source = RssFeedSource::new(config.feed_url.clone(), config.fetch.clone())?;
    let adapter = GroqAdapter::new(
        config.groq_api_key.clone(),
        config.groq_api_url.clone(),
        config.groq_model.clone(),
    )?;

    let updater = ArticleUpdater::new(
        Arc::new(source),
        store,
        Enricher::new(Arc::new(adapter), config.generic_tag.clone()),
        UpdateSettings::from(config),
    )
    .with_span(tracing::info_span!("update", feed = %config.feed_url));
    Ok(updater)
}

async fn watch(updater: &ArticleUpdater, limit: usize, interval_minutes: u64) {
    let period = Duration::from_secs(interval_minutes.max(1) * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!("Running updates every {} minutes", interval_minutes.max(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match updater.run_update(limit).await {
                    Ok(summary) => info!(
                        "Scheduled run complete: {} new, {} deleted, {} stored",
                        summary.article_stats.new_articles,
                        summary.article_stats.deleted_old_articles,
                        summary.article_stats.total_stored_articles
                    ),
                    Err(e) => error!("Scheduled run failed ({:?}): {}", e.kind(), e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping scheduler");
                break;
            }
        }
    }
}

fn report_failure(err: &anyhow::Error) {
    let kind = err.downcast_ref::<UpdaterError>().map(UpdaterError::kind);
    error!("Update failed: {:#}", err);

    let report = serde_json::json!({
        "success": false,
        "error": format!("{:#}", err),
        "kind": kind,
        "timestamp": Utc::now(),
        "environmentCheck": ConfigReport::from_env(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{{\"success\":false}}"),
    }
}
