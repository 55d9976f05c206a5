use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::extract::ArticleStats;
use crate::users::{Identity, UserTotals};

/// A processed article.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub num: i64,
    pub title: String,
    pub date: NaiveDateTime,
    pub comment_count: i64,
    pub first_comment_date: Option<NaiveDateTime>,
    pub last_comment_date: Option<NaiveDateTime>,
    pub total_comment_length: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for inserting an article, or refreshing its derived statistics.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub num: i64,
    pub title: String,
    pub date: NaiveDateTime,
    pub comment_count: i64,
    pub first_comment_date: Option<NaiveDateTime>,
    pub last_comment_date: Option<NaiveDateTime>,
    pub total_comment_length: i64,
}

impl From<&ArticleStats> for NewArticle {
    fn from(stats: &ArticleStats) -> Self {
        Self {
            num: stats.num,
            title: stats.title.clone(),
            date: stats.date,
            comment_count: stats.comment_count,
            first_comment_date: stats.first_comment_date,
            last_comment_date: stats.last_comment_date,
            total_comment_length: stats.total_comment_length,
        }
    }
}

/// A commenting identity with its accumulated statistics.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub registered: bool,
    pub commented_article_count: i64,
    pub comment_count: i64,
    pub ranked_comment_count: i64,
    pub first_comment_time: Option<NaiveDateTime>,
    pub last_comment_time: Option<NaiveDateTime>,
    pub first_comment_count: i64,
    pub total_comment_rank: f64,
    pub total_comment_length: i64,
    pub most_commented_article_comment_count: i64,
    pub most_commented_article_num: Option<i64>,
}

impl User {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            registered: self.registered,
        }
    }

    /// The stored aggregate, ready to be merged into.
    #[must_use]
    pub fn totals(&self) -> UserTotals {
        UserTotals {
            commented_article_count: self.commented_article_count,
            comment_count: self.comment_count,
            ranked_comment_count: self.ranked_comment_count,
            first_comment_time: self.first_comment_time,
            last_comment_time: self.last_comment_time,
            first_comment_count: self.first_comment_count,
            total_comment_rank: self.total_comment_rank,
            total_comment_length: self.total_comment_length,
            most_commented_article_comment_count: self.most_commented_article_comment_count,
            most_commented_article_num: self.most_commented_article_num,
        }
    }
}
