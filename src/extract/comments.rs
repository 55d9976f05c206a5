use chrono::NaiveDateTime;
use serde::Serialize;

use super::{
    article_date, article_num, article_title, comment_containers, comment_rank, comment_text,
    comment_time, comment_user, user_registered, ExtractResult,
};
use crate::markup::Element;

/// One parsed comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub user: String,
    pub registered: bool,
    pub time: NaiveDateTime,
    pub rank: Option<f64>,
    pub text: String,
    /// Position zero in page display order.
    pub first: bool,
}

/// Everything extracted from one article page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleStats {
    pub num: i64,
    pub title: String,
    pub date: NaiveDateTime,
    pub comments: Vec<CommentRecord>,
    pub comment_count: i64,
    pub first_comment_date: Option<NaiveDateTime>,
    pub last_comment_date: Option<NaiveDateTime>,
    pub total_comment_length: i64,
}

/// Character count of `text` with line breaks removed.
#[must_use]
pub fn text_length(text: &str) -> i64 {
    text.chars().filter(|c| !matches!(c, '\n' | '\r')).count() as i64
}

/// Parse raw comment containers into records.
///
/// `first` is set purely by position, so it does not depend on timestamps.
///
/// # Errors
///
/// Returns the first missing field of any comment.
pub fn parse_comments(containers: &[&Element]) -> ExtractResult<Vec<CommentRecord>> {
    containers
        .iter()
        .enumerate()
        .map(|(index, container)| {
            Ok(CommentRecord {
                user: comment_user(container)?,
                registered: user_registered(container)?,
                time: comment_time(container)?,
                rank: comment_rank(container)?,
                text: comment_text(container),
                first: index == 0,
            })
        })
        .collect()
}

/// Extract page fields and comments, and derive the article statistics.
///
/// # Errors
///
/// Returns an error if a page field or any comment field is missing.
pub fn parse_article(page: &Element) -> ExtractResult<ArticleStats> {
    let num = article_num(page)?;
    let title = article_title(page)?;
    let date = article_date(page)?;
    let comments = parse_comments(&comment_containers(page))?;

    Ok(ArticleStats {
        num,
        title,
        date,
        comment_count: comments.len() as i64,
        first_comment_date: comments.iter().map(|c| c.time).min(),
        last_comment_date: comments.iter().map(|c| c.time).max(),
        total_comment_length: comments.iter().map(|c| text_length(&c.text)).sum(),
        comments,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::fixtures::*;
    use super::super::ExtractError;
    use super::*;
    use crate::markup::parse_html;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 2, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_comments_empty() {
        assert_eq!(parse_comments(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn test_parse_article_without_comments() {
        let page = parse_html(&article_page(7, "Ticho", "3.2.2013", &[]));
        let stats = parse_article(&page).unwrap();
        assert_eq!(stats.num, 7);
        assert_eq!(stats.comment_count, 0);
        assert!(stats.comments.is_empty());
        assert_eq!(stats.first_comment_date, None);
        assert_eq!(stats.last_comment_date, None);
        assert_eq!(stats.total_comment_length, 0);
    }

    #[test]
    fn test_parse_article_two_comments() {
        let cells = vec![
            comment_cell(&anonymous("Jano", "01.02.2013 10:00"), Some("+7.5"), "Prvy"),
            comment_cell(&registered("Ferko", "01.02.2013 11:00"), None, "Druhy\nriadok"),
        ];
        let page = parse_html(&article_page(42, "T", "01.02.2013", &cells));
        let stats = parse_article(&page).unwrap();

        assert_eq!(stats.num, 42);
        assert_eq!(stats.title, "T");
        assert_eq!(stats.date, at(1, 0, 0));
        assert_eq!(stats.comment_count, 2);
        assert_eq!(stats.first_comment_date, Some(at(1, 10, 0)));
        assert_eq!(stats.last_comment_date, Some(at(1, 11, 0)));

        let expected: i64 = stats.comments.iter().map(|c| text_length(&c.text)).sum();
        assert_eq!(stats.total_comment_length, expected);
        assert!(expected > 0);

        let first = &stats.comments[0];
        assert_eq!(first.user, "Jano");
        assert!(!first.registered);
        assert_eq!(first.rank, Some(7.5));
        assert!(first.first);

        let second = &stats.comments[1];
        assert_eq!(second.user, "Ferko");
        assert!(second.registered);
        assert_eq!(second.rank, None);
        assert!(!second.first);
    }

    #[test]
    fn test_first_flag_is_positional() {
        // Page order is newest first here; the first comment is still index 0.
        let cells = vec![
            comment_cell(&anonymous("B", "02.02.2013 12:00"), None, "later"),
            comment_cell(&anonymous("A", "01.02.2013 09:00"), None, "earlier"),
        ];
        let page = parse_html(&article_page(5, "T", "01.02.2013", &cells));
        let stats = parse_article(&page).unwrap();

        assert!(stats.comments[0].first);
        assert_eq!(stats.comments[0].user, "B");
        assert!(!stats.comments[1].first);
        assert_eq!(stats.first_comment_date, Some(at(1, 9, 0)));
        assert_eq!(stats.last_comment_date, Some(at(2, 12, 0)));
    }

    #[test]
    fn test_total_length_strips_newlines() {
        let html = "<html><body><div id=\"body\"><table cellspacing=\"10\"><tr>\
<td bgcolor=\"#ffffff\"><div><font>Od: A&nbsp;&nbsp;&nbsp;&nbsp;1.2.2013 10:00</font></div>ab\ncd</td>\
</tr></table></div></body></html>";
        let page = parse_html(html);
        let comments = parse_comments(&comment_containers(&page)).unwrap();

        // "Od: A" + 4 nbsp + "1.2.2013 10:00" + "ab" + "cd"
        assert_eq!(text_length(&comments[0].text), 5 + 4 + 14 + 2 + 2);
    }

    #[test]
    fn test_text_length_counts_characters() {
        assert_eq!(text_length("čšž\r\nň"), 4);
        assert_eq!(text_length(""), 0);
    }

    #[test]
    fn test_bad_comment_fails_article() {
        let cells = vec![
            comment_cell(&anonymous("A", "01.02.2013 10:00"), None, "ok"),
            comment_cell("Anonym 01.02.2013 10:00", None, "broken"),
        ];
        let page = parse_html(&article_page(9, "T", "01.02.2013", &cells));
        assert_eq!(
            parse_article(&page),
            Err(ExtractError::MissingField { field: "user" })
        );
    }
}
