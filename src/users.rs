//! Per-user running aggregates.
//!
//! A user is identified by display name *and* registration status. Each
//! article contributes one merge per identity that commented on it; the merge
//! only ever adds to counters and widens the first/last comment window, so
//! history never has to be reprocessed.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::extract::{text_length, CommentRecord};

/// Identity key of a commenting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Identity {
    pub name: String,
    pub registered: bool,
}

impl Identity {
    #[must_use]
    pub fn of(comment: &CommentRecord) -> Self {
        Self {
            name: comment.user.clone(),
            registered: comment.registered,
        }
    }
}

/// Running statistics for one identity.
///
/// `Default` is the zero record every identity starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserTotals {
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

impl UserTotals {
    /// Totals of a single article's group, as if merged into a zero record.
    #[must_use]
    pub fn from_group(group: &[&CommentRecord], article_num: i64) -> Self {
        let mut totals = Self::default();
        totals.merge(group, article_num);
        totals
    }

    /// Fold one article's comments by this user into the running totals.
    ///
    /// Must be called at most once per (article, identity); re-merging the
    /// same article counts its comments twice. An empty group is a no-op.
    pub fn merge(&mut self, group: &[&CommentRecord], article_num: i64) {
        if group.is_empty() {
            return;
        }
        let count = group.len() as i64;

        self.commented_article_count += 1;
        self.comment_count += count;
        self.ranked_comment_count += group.iter().filter(|c| c.rank.is_some()).count() as i64;
        self.first_comment_count += group.iter().filter(|c| c.first).count() as i64;
        self.total_comment_rank += group.iter().filter_map(|c| c.rank).sum::<f64>();
        self.total_comment_length += group.iter().map(|c| text_length(&c.text)).sum::<i64>();

        let earliest = group.iter().map(|c| c.time).min();
        let latest = group.iter().map(|c| c.time).max();
        self.first_comment_time = earliest_of(self.first_comment_time, earliest);
        self.last_comment_time = latest_of(self.last_comment_time, latest);

        // Strictly greater: an equal count keeps the article recorded first.
        if count > self.most_commented_article_comment_count {
            self.most_commented_article_comment_count = count;
            self.most_commented_article_num = Some(article_num);
        }
    }
}

fn earliest_of(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest_of(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    a.max(b)
}

/// Partition comments by identity, keeping first-appearance order of identities
/// and page order within each group.
#[must_use]
pub fn group_by_identity(comments: &[CommentRecord]) -> Vec<(Identity, Vec<&CommentRecord>)> {
    let mut index: HashMap<Identity, usize> = HashMap::new();
    let mut groups: Vec<(Identity, Vec<&CommentRecord>)> = Vec::new();

    for comment in comments {
        let identity = Identity::of(comment);
        if let Some(&slot) = index.get(&identity) {
            groups[slot].1.push(comment);
        } else {
            index.insert(identity.clone(), groups.len());
            groups.push((identity, vec![comment]));
        }
    }

    groups
}
