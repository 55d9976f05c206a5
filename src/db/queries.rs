//! Query functions accept any SQLite executor: the pool for standalone
//! statements, or `&mut *tx` to run inside a transaction.

use anyhow::{Context, Result};
use sqlx::SqliteExecutor;

use super::models::{Article, NewArticle, User};
use crate::users::{Identity, UserTotals};

// ========== Articles ==========

/// Get an article by its number.
pub async fn get_article_by_num(
    db: impl SqliteExecutor<'_>,
    num: i64,
) -> Result<Option<Article>> {
    sqlx::query_as("SELECT * FROM articles WHERE num = ?")
        .bind(num)
        .fetch_optional(db)
        .await
        .context("Failed to fetch article by num")
}

/// Insert a new article, returning its ID.
pub async fn insert_article(db: impl SqliteExecutor<'_>, article: &NewArticle) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO articles (num, title, date, comment_count, first_comment_date,
                              last_comment_date, total_comment_length)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(article.num)
    .bind(&article.title)
    .bind(article.date)
    .bind(article.comment_count)
    .bind(article.first_comment_date)
    .bind(article.last_comment_date)
    .bind(article.total_comment_length)
    .execute(db)
    .await
    .context("Failed to insert article")?;

    Ok(result.last_insert_rowid())
}

/// Overwrite the derived comment statistics of an existing article.
///
/// `num`, `title` and `date` are never changed after insertion.
pub async fn update_article_stats(
    db: impl SqliteExecutor<'_>,
    id: i64,
    article: &NewArticle,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE articles
        SET comment_count = ?, first_comment_date = ?, last_comment_date = ?,
            total_comment_length = ?, updated_at = datetime('now')
        WHERE id = ?
        ",
    )
    .bind(article.comment_count)
    .bind(article.first_comment_date)
    .bind(article.last_comment_date)
    .bind(article.total_comment_length)
    .bind(id)
    .execute(db)
    .await
    .context("Failed to update article stats")?;

    Ok(())
}

/// Count stored articles.
pub async fn count_articles(db: impl SqliteExecutor<'_>) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
        .fetch_one(db)
        .await
        .context("Failed to count articles")?;
    Ok(count)
}

// ========== Users ==========

/// Get a user by identity.
pub async fn get_user_by_identity(
    db: impl SqliteExecutor<'_>,
    identity: &Identity,
) -> Result<Option<User>> {
    sqlx::query_as("SELECT * FROM users WHERE name = ? AND registered = ?")
        .bind(&identity.name)
        .bind(identity.registered)
        .fetch_optional(db)
        .await
        .context("Failed to fetch user by identity")
}

/// Insert a new user, returning its ID.
pub async fn insert_user(
    db: impl SqliteExecutor<'_>,
    identity: &Identity,
    totals: &UserTotals,
) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO users (name, registered, commented_article_count, comment_count,
                           ranked_comment_count, first_comment_time, last_comment_time,
                           first_comment_count, total_comment_rank, total_comment_length,
                           most_commented_article_comment_count, most_commented_article_num)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&identity.name)
    .bind(identity.registered)
    .bind(totals.commented_article_count)
    .bind(totals.comment_count)
    .bind(totals.ranked_comment_count)
    .bind(totals.first_comment_time)
    .bind(totals.last_comment_time)
    .bind(totals.first_comment_count)
    .bind(totals.total_comment_rank)
    .bind(totals.total_comment_length)
    .bind(totals.most_commented_article_comment_count)
    .bind(totals.most_commented_article_num)
    .execute(db)
    .await
    .context("Failed to insert user")?;

    Ok(result.last_insert_rowid())
}

/// Replace the stored aggregate of an existing user.
pub async fn update_user(
    db: impl SqliteExecutor<'_>,
    id: i64,
    totals: &UserTotals,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE users
        SET commented_article_count = ?, comment_count = ?, ranked_comment_count = ?,
            first_comment_time = ?, last_comment_time = ?, first_comment_count = ?,
            total_comment_rank = ?, total_comment_length = ?,
            most_commented_article_comment_count = ?, most_commented_article_num = ?
        WHERE id = ?
        ",
    )
    .bind(totals.commented_article_count)
    .bind(totals.comment_count)
    .bind(totals.ranked_comment_count)
    .bind(totals.first_comment_time)
    .bind(totals.last_comment_time)
    .bind(totals.first_comment_count)
    .bind(totals.total_comment_rank)
    .bind(totals.total_comment_length)
    .bind(totals.most_commented_article_comment_count)
    .bind(totals.most_commented_article_num)
    .bind(id)
    .execute(db)
    .await
    .context("Failed to update user")?;

    Ok(())
}

/// Count stored user identities.
pub async fn count_users(db: impl SqliteExecutor<'_>) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("Failed to count users")?;
    Ok(count)
}

/// Users with the most comments, for the end-of-run report.
pub async fn get_top_users(db: impl SqliteExecutor<'_>, limit: i64) -> Result<Vec<User>> {
    sqlx::query_as("SELECT * FROM users ORDER BY comment_count DESC, id ASC LIMIT ?")
        .bind(limit)
        .fetch_all(db)
        .await
        .context("Failed to fetch top users")
}
