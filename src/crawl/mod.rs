//! Crawl driver: fetch, classify, extract and persist article pages.
//!
//! Each article number is an independent task. A task that fails (network
//! error, missing field, database error) is logged with its number and
//! recorded in the [`CrawlSummary`]; it never stops the rest of the range.

pub mod locks;
pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqliteConnection;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db::{
    get_article_by_num, get_user_by_identity, insert_article, insert_user, update_article_stats,
    update_user, Database, NewArticle,
};
use crate::extract::{is_article, parse_article, ArticleStats, CommentRecord};
use crate::fetch::PageFetcher;
use crate::users::{group_by_identity, Identity, UserTotals};

pub use locks::{KeyGuard, KeyedLocks, RecordKey};
pub use pool::{PoolCounters, PoolStats, WorkerPool};

/// Result of one successfully finished article task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArticleOutcome {
    /// The page is a listing page; nothing was stored.
    Skipped,
    /// Article and user aggregates were written.
    Persisted {
        num: i64,
        comment_count: i64,
        users: usize,
    },
}

/// Aggregate result of crawling a range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub persisted: usize,
    pub skipped: usize,
    /// Article numbers whose task failed, ascending.
    pub failed: Vec<i64>,
    /// Tasks that panicked; their numbers are not known.
    pub panicked: usize,
}

impl CrawlSummary {
    fn record(&mut self, num: i64, result: &Result<ArticleOutcome>) {
        match result {
            Ok(ArticleOutcome::Persisted { .. }) => self.persisted += 1,
            Ok(ArticleOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed.push(num),
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.persisted + self.skipped + self.failed.len() + self.panicked
    }
}

/// Runs the per-article pipeline against one database.
#[derive(Debug, Clone)]
pub struct Crawler {
    config: Config,
    db: Database,
    fetcher: PageFetcher,
    locks: Arc<KeyedLocks<RecordKey>>,
}

impl Crawler {
    #[must_use]
    pub fn new(config: Config, db: Database, fetcher: PageFetcher) -> Self {
        Self {
            config,
            db,
            fetcher,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub const fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// Fetch, classify, extract and persist a single article page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched, a required field is
    /// missing, or the database rejects a write.
    pub async fn process_article(&self, num: i64) -> Result<ArticleOutcome> {
        let url = self.config.article_url(num);
        let page = self
            .fetcher
            .fetch_page(&url)
            .await
            .with_context(|| format!("Failed to fetch article {num}"))?;

        if !is_article(&page) {
            debug!(num, "Not an article page, skipping");
            return Ok(ArticleOutcome::Skipped);
        }

        let stats =
            parse_article(&page).with_context(|| format!("Failed to extract article {num}"))?;
        drop(page);

        let users = self.persist_article(&stats).await?;

        debug!(
            num = stats.num,
            comments = stats.comment_count,
            users,
            "Article persisted"
        );
        Ok(ArticleOutcome::Persisted {
            num: stats.num,
            comment_count: stats.comment_count,
            users,
        })
    }

    /// Store the article and fold its comments into the user aggregates as one
    /// transaction.
    ///
    /// Returns the number of identities touched. The article's key and every
    /// commenter's key are locked first, then all writes run inside a single
    /// `BEGIN IMMEDIATE` transaction. A failure at any point leaves nothing
    /// behind, so the article number can be re-run safely.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails; the transaction is rolled
    /// back.
    pub async fn persist_article(&self, stats: &ArticleStats) -> Result<usize> {
        let groups = group_by_identity(&stats.comments);
        let keys = std::iter::once(RecordKey::Article(stats.num)).chain(
            groups
                .iter()
                .map(|(identity, _)| RecordKey::User(identity.clone())),
        );
        let _guards = self.locks.lock_all(keys).await;

        // IMMEDIATE takes the write lock up front; a deferred transaction that
        // reads first can fail with SQLITE_BUSY when it later writes.
        let mut tx = self
            .db
            .pool()
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin article transaction")?;

        store_article(&mut *tx, stats).await?;
        for (identity, group) in &groups {
            fold_comments(&mut *tx, identity, group, stats.num).await?;
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit article {}", stats.num))?;
        Ok(groups.len())
    }

    /// Crawl `[from, to]` on the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error only if the pool cannot accept work; individual task
    /// failures are reported in the summary.
    pub async fn crawl_range(&self, from: i64, to: i64) -> Result<CrawlSummary> {
        let mut pool = WorkerPool::new(self.config.worker_concurrency);
        let reporter = spawn_progress_reporter(pool.counters(), self.config.progress_interval);

        info!(from, to, workers = self.config.worker_concurrency, "Starting crawl");

        for num in from..=to {
            let crawler = self.clone();
            pool.submit(async move {
                let result = crawler.process_article(num).await;
                if let Err(e) = &result {
                    error!(num, "Article task failed: {e:#}");
                }
                (num, result)
            })
            .await?;
        }

        let (outputs, stats) = pool.drain().await;
        drop(reporter);

        let mut summary = CrawlSummary {
            panicked: stats.panicked,
            ..CrawlSummary::default()
        };
        for (num, result) in &outputs {
            summary.record(*num, result);
        }
        summary.failed.sort_unstable();

        log_summary(&summary);
        Ok(summary)
    }

    /// Crawl `[from, to]` one article at a time, without the pool.
    pub async fn crawl_range_sequential(&self, from: i64, to: i64) -> CrawlSummary {
        info!(from, to, "Starting sequential crawl");

        let mut summary = CrawlSummary::default();
        for num in from..=to {
            let result = self.process_article(num).await;
            if let Err(e) = &result {
                error!(num, "Article task failed: {e:#}");
            }
            summary.record(num, &result);
        }

        log_summary(&summary);
        summary
    }
}

/// Create the article, or refresh the derived statistics of an existing one.
async fn store_article(conn: &mut SqliteConnection, stats: &ArticleStats) -> Result<()> {
    let article = NewArticle::from(stats);
    if let Some(existing) = get_article_by_num(&mut *conn, stats.num).await? {
        update_article_stats(&mut *conn, existing.id, &article).await
    } else {
        insert_article(&mut *conn, &article).await.map(|_| ())
    }
}

/// Merge one identity's comments on an article into its stored aggregate.
async fn fold_comments(
    conn: &mut SqliteConnection,
    identity: &Identity,
    group: &[&CommentRecord],
    article_num: i64,
) -> Result<()> {
    match get_user_by_identity(&mut *conn, identity).await? {
        Some(user) => {
            let mut totals = user.totals();
            totals.merge(group, article_num);
            update_user(&mut *conn, user.id, &totals).await
        }
        None => {
            let totals = UserTotals::from_group(group, article_num);
            insert_user(&mut *conn, identity, &totals).await.map(|_| ())
        }
    }
}

const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Log pool counters every `interval`. Dropping the returned set stops the
/// reporter, including when the crawl returns early or is cancelled.
fn spawn_progress_reporter(counters: Arc<PoolCounters>, interval: Duration) -> JoinSet<()> {
    let period = interval.max(MIN_PROGRESS_INTERVAL);
    let mut reporter = JoinSet::new();
    reporter.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = counters.snapshot();
            info!(
                submitted = stats.submitted,
                active = stats.active,
                completed = stats.completed,
                "Crawl progress"
            );
        }
    });
    reporter
}

fn log_summary(summary: &CrawlSummary) {
    info!(
        persisted = summary.persisted,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        panicked = summary.panicked,
        "Crawl finished"
    );
    if !summary.failed.is_empty() {
        error!(numbers = ?summary.failed, "Failed articles (re-run these numbers)");
    }
}
