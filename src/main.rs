use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use comment_stats_crawler::config::Config;
use comment_stats_crawler::crawl::{CrawlSummary, Crawler};
use comment_stats_crawler::db::{count_articles, count_users, get_top_users, Database};
use comment_stats_crawler::fetch::PageFetcher;

/// Crawl numbered article pages and aggregate their comment statistics.
#[derive(Parser, Debug)]
#[command(name = "comment-stats-crawler", version, about)]
struct Args {
    /// First article number (default: 1)
    #[arg(value_name = "FROM", value_parser = clap::value_parser!(i64).range(1..))]
    from: Option<i64>,

    /// Last article number, inclusive (default: newest number from the feed)
    #[arg(value_name = "TO", value_parser = clap::value_parser!(i64).range(1..))]
    to: Option<i64>,

    /// Process articles one at a time instead of using the worker pool
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Worker pool size (overrides WORKER_CONCURRENCY)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Print the crawl summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(concurrency) = args.concurrency {
        config.worker_concurrency = concurrency;
    }
    config.validate().context("Invalid configuration")?;

    info!(template = %config.article_url_template, "Configuration loaded");

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!(path = %config.database_path.display(), "Database initialized");

    let fetcher = PageFetcher::new(&config)?;
    let from = args.from.unwrap_or(1);
    let to = match args.to {
        Some(to) => to,
        None => {
            let latest = fetcher
                .discover_latest_article(&config.feed_url)
                .await
                .context("Failed to discover newest article number")?;
            info!(latest, "Discovered newest article");
            latest
        }
    };

    if from > to {
        warn!(from, to, "Empty range, nothing to crawl");
    }

    let sequential = args.sequential;
    let crawler = Crawler::new(config, db.clone(), fetcher);

    // Dropping the crawl future on shutdown drops the worker pool, which
    // aborts any tasks still running.
    let summary: CrawlSummary = tokio::select! {
        summary = async {
            if sequential {
                Ok(crawler.crawl_range_sequential(from, to).await)
            } else {
                crawler.crawl_range(from, to).await
            }
        } => summary?,
        () = shutdown_signal() => {
            warn!("Interrupted, outstanding tasks aborted");
            return Ok(());
        }
    };

    let articles = count_articles(db.pool()).await?;
    let users = count_users(db.pool()).await?;
    info!(articles, users, "Store totals");
    for user in get_top_users(db.pool(), 5).await? {
        info!(
            name = %user.name,
            registered = user.registered,
            comments = user.comment_count,
            articles = user.commented_article_count,
            "Top commenter"
        );
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,comment_stats_crawler=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
