//! Integration tests for database operations.

use chrono::{NaiveDate, NaiveDateTime};
use comment_stats_crawler::db::{
    count_articles, count_users, get_article_by_num, get_top_users, get_user_by_identity,
    insert_article, insert_user, update_article_stats, update_user, Database, NewArticle,
};
use comment_stats_crawler::users::{Identity, UserTotals};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2013, 2, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn new_article(num: i64, comment_count: i64) -> NewArticle {
    NewArticle {
        num,
        title: format!("Article {num}"),
        date: at(1, 0),
        comment_count,
        first_comment_date: (comment_count > 0).then(|| at(1, 10)),
        last_comment_date: (comment_count > 0).then(|| at(1, 12)),
        total_comment_length: comment_count * 40,
    }
}

#[tokio::test]
async fn test_insert_and_get_article() {
    let (db, _temp_dir) = setup_db().await;

    let id = insert_article(db.pool(), &new_article(42, 2))
        .await
        .expect("Failed to insert article");
    assert!(id > 0);

    let article = get_article_by_num(db.pool(), 42)
        .await
        .expect("Failed to get article")
        .expect("Article not found");
    assert_eq!(article.id, id);
    assert_eq!(article.title, "Article 42");
    assert_eq!(article.date, at(1, 0));
    assert_eq!(article.comment_count, 2);
    assert_eq!(article.first_comment_date, Some(at(1, 10)));
    assert_eq!(article.last_comment_date, Some(at(1, 12)));
    assert_eq!(article.total_comment_length, 80);

    assert!(get_article_by_num(db.pool(), 43).await.unwrap().is_none());
}

#[tokio::test]
async fn test_article_without_comments_has_null_dates() {
    let (db, _temp_dir) = setup_db().await;

    insert_article(db.pool(), &new_article(7, 0)).await.unwrap();
    let article = get_article_by_num(db.pool(), 7).await.unwrap().unwrap();
    assert_eq!(article.comment_count, 0);
    assert_eq!(article.first_comment_date, None);
    assert_eq!(article.last_comment_date, None);
}

#[tokio::test]
async fn test_update_article_stats_keeps_identity_fields() {
    let (db, _temp_dir) = setup_db().await;

    let id = insert_article(db.pool(), &new_article(100, 3)).await.unwrap();

    let mut refreshed = new_article(100, 5);
    refreshed.title = "Changed headline".to_string();
    refreshed.date = at(20, 0);
    refreshed.last_comment_date = Some(at(3, 18));
    update_article_stats(db.pool(), id, &refreshed).await.unwrap();

    let article = get_article_by_num(db.pool(), 100).await.unwrap().unwrap();
    assert_eq!(article.comment_count, 5);
    assert_eq!(article.total_comment_length, 200);
    assert_eq!(article.last_comment_date, Some(at(3, 18)));
    assert_eq!(article.title, "Article 100");
    assert_eq!(article.date, at(1, 0));
    assert_eq!(count_articles(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_article_num_rejected() {
    let (db, _temp_dir) = setup_db().await;

    insert_article(db.pool(), &new_article(1, 0)).await.unwrap();
    assert!(insert_article(db.pool(), &new_article(1, 0)).await.is_err());
}

#[tokio::test]
async fn test_user_identity_includes_registration() {
    let (db, _temp_dir) = setup_db().await;

    let anonymous = Identity {
        name: "jano".to_string(),
        registered: false,
    };
    let registered = Identity {
        name: "jano".to_string(),
        registered: true,
    };
    let totals = UserTotals {
        commented_article_count: 1,
        comment_count: 2,
        first_comment_time: Some(at(1, 9)),
        last_comment_time: Some(at(1, 11)),
        most_commented_article_comment_count: 2,
        most_commented_article_num: Some(42),
        ..UserTotals::default()
    };

    insert_user(db.pool(), &anonymous, &totals).await.unwrap();
    insert_user(db.pool(), &registered, &UserTotals::default())
        .await
        .unwrap();
    assert_eq!(count_users(db.pool()).await.unwrap(), 2);

    let user = get_user_by_identity(db.pool(), &anonymous)
        .await
        .unwrap()
        .expect("User not found");
    assert_eq!(user.identity(), anonymous);
    assert_eq!(user.totals(), totals);

    let other = get_user_by_identity(db.pool(), &registered)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(other.id, user.id);
    assert_eq!(other.comment_count, 0);

    assert!(insert_user(db.pool(), &anonymous, &totals).await.is_err());
}

#[tokio::test]
async fn test_update_user_round_trips_totals() {
    let (db, _temp_dir) = setup_db().await;

    let identity = Identity {
        name: "ferko".to_string(),
        registered: true,
    };
    let id = insert_user(db.pool(), &identity, &UserTotals::default())
        .await
        .unwrap();

    let totals = UserTotals {
        commented_article_count: 3,
        comment_count: 9,
        ranked_comment_count: 4,
        first_comment_time: Some(at(1, 8)),
        last_comment_time: Some(at(5, 22)),
        first_comment_count: 1,
        total_comment_rank: 12.5,
        total_comment_length: 1234,
        most_commented_article_comment_count: 5,
        most_commented_article_num: Some(17),
    };
    update_user(db.pool(), id, &totals).await.unwrap();

    let user = get_user_by_identity(db.pool(), &identity)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.totals(), totals);
}

#[tokio::test]
async fn test_top_users_ordered_by_comment_count() {
    let (db, _temp_dir) = setup_db().await;

    for (name, count) in [("a", 1), ("b", 7), ("c", 3)] {
        let identity = Identity {
            name: name.to_string(),
            registered: false,
        };
        let totals = UserTotals {
            comment_count: count,
            ..UserTotals::default()
        };
        insert_user(db.pool(), &identity, &totals).await.unwrap();
    }

    let top = get_top_users(db.pool(), 2).await.unwrap();
    let names: Vec<_> = top.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);
}
