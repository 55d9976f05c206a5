//! Field extraction from parsed article pages.
//!
//! Every extractor is partial: when the node it looks for is absent, or its
//! text does not match the expected pattern, it returns
//! [`ExtractError::MissingField`] instead of guessing a value. The rank is
//! the one optional field; a comment without a rank widget yields `Ok(None)`.

pub mod comments;

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::constants::{
    ARTICLE_SUMMARY_CLASS, BOX_TITLE_CLASS, CANONICAL_URL_PROPERTY, COMMENTS_BODY_ID,
    COMMENTS_TABLE_CELLSPACING, COMMENT_CELL_BGCOLOR, PAGE_TITLE_CLASS,
};
use crate::markup::{
    find_all_in, find_by_attr, find_by_class, find_by_id, find_by_tag, text_content, Element,
};

pub use comments::{parse_article, parse_comments, text_length, ArticleStats, CommentRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("missing field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

pub type ExtractResult<T> = Result<T, ExtractError>;

const fn missing(field: &'static str) -> ExtractError {
    ExtractError::MissingField { field }
}

/// Day-month-year date, e.g. `1.2.2013` or `01.02.2013`.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());

/// Day-month-year date followed by hours and minutes, e.g. `01.02.2013 10:00`.
static DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})\s+(\d{1,2}):(\d{2})").unwrap()
});

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Signed rank with up to two integer digits and one optional fractional digit.
static RANK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d{1,2}(?:[.,]\d)?").unwrap());

// Bylines are "Od: NAME" or "Od reg.: NAME" followed by a run of padding
// whitespace (rendered as &nbsp;) before the timestamp. The padding marks
// where the name ends, so names may contain single spaces.
static ANONYMOUS_BYLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Od:\s+(.+?)\s{4}").unwrap());
static REGISTERED_BYLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Od reg\.:\s+(.+?)\s{4}").unwrap());
static ANONYMOUS_BYLINE_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Od:\s+(.+?)\s{2}").unwrap());
static REGISTERED_BYLINE_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Od reg\.:\s+(.+?)\s{2}").unwrap());

// ========== Page level ==========

/// Whether the page is a single article rather than a listing page.
#[must_use]
pub fn is_article(page: &Element) -> bool {
    find_by_class(page, BOX_TITLE_CLASS).is_empty()
}

/// Headline text of the article.
pub fn article_title(page: &Element) -> ExtractResult<String> {
    let node = find_by_class(page, PAGE_TITLE_CLASS)
        .into_iter()
        .next()
        .ok_or(missing("title"))?;
    let title = text_content(node).trim().to_string();
    if title.is_empty() {
        return Err(missing("title"));
    }
    Ok(title)
}

/// Publish date of the article, taken from the summary line (midnight).
pub fn article_date(page: &Element) -> ExtractResult<NaiveDateTime> {
    let node = find_by_class(page, ARTICLE_SUMMARY_CLASS)
        .into_iter()
        .next()
        .ok_or(missing("date"))?;
    let text = text_content(node);
    let caps = DATE_PATTERN.captures(&text).ok_or(missing("date"))?;

    let date =
        parse_date(&caps[1], &caps[2], &caps[3]).ok_or_else(|| ExtractError::InvalidValue {
            field: "date",
            value: caps[0].to_string(),
        })?;
    date.and_hms_opt(0, 0, 0).ok_or(missing("date"))
}

/// Article number: the first integer run of the canonical URL.
pub fn article_num(page: &Element) -> ExtractResult<i64> {
    let url = find_by_attr(page, "property", CANONICAL_URL_PROPERTY)
        .into_iter()
        .find_map(|meta| meta.attr("content"))
        .ok_or(missing("num"))?;
    let digits = INTEGER_PATTERN.find(url).ok_or(missing("num"))?;
    digits.as_str().parse().map_err(|_| ExtractError::InvalidValue {
        field: "num",
        value: digits.as_str().to_string(),
    })
}

/// Raw per-comment container nodes, in page order.
#[must_use]
pub fn comment_containers(page: &Element) -> Vec<&Element> {
    let body = find_by_id(page, COMMENTS_BODY_ID);
    let tables = find_all_in(&body, |e| {
        e.attr("cellspacing") == Some(COMMENTS_TABLE_CELLSPACING)
    });
    find_all_in(&tables, |e| e.attr("bgcolor") == Some(COMMENT_CELL_BGCOLOR))
}

// ========== Per comment ==========

/// Raw byline text: the first `font` inside a `div` of the container.
pub fn comment_info_text(container: &Element) -> ExtractResult<String> {
    let divs = find_by_tag(container, "div");
    find_all_in(&divs, |e| e.tag == "font")
        .first()
        .map(|font| text_content(font))
        .ok_or(missing("byline"))
}

fn byline(container: &Element) -> ExtractResult<String> {
    Ok(comment_info_text(container)?.replace(['\n', '\r'], ""))
}

/// Display name of the comment author.
pub fn comment_user(container: &Element) -> ExtractResult<String> {
    let text = byline(container)?;
    let anonymous = ANONYMOUS_BYLINE.captures(&text);
    let registered = REGISTERED_BYLINE.captures(&text);
    anonymous
        .or(registered)
        .map(|caps| caps[1].trim().to_string())
        .ok_or(missing("user"))
}

/// Whether the author byline uses the registered-user form.
pub fn user_registered(container: &Element) -> ExtractResult<bool> {
    let text = byline(container)?;
    if REGISTERED_BYLINE_SHORT.is_match(&text) {
        Ok(true)
    } else if ANONYMOUS_BYLINE_SHORT.is_match(&text) {
        Ok(false)
    } else {
        Err(missing("registered"))
    }
}

/// Posting time from the byline.
pub fn comment_time(container: &Element) -> ExtractResult<NaiveDateTime> {
    let text = byline(container)?;
    let caps = DATETIME_PATTERN.captures(&text).ok_or(missing("time"))?;

    let invalid = || ExtractError::InvalidValue {
        field: "time",
        value: caps[0].to_string(),
    };
    let date = parse_date(&caps[1], &caps[2], &caps[3]).ok_or_else(invalid)?;
    let hour: u32 = caps[4].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[5].parse().map_err(|_| invalid())?;
    date.and_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

fn rank_widget(container: &Element) -> Vec<&Element> {
    let spans = find_by_tag(container, "span");
    find_all_in(&spans, |e| e.tag == "font")
}

/// A rank widget is two `font` nodes nested in a `span`.
#[must_use]
pub fn has_rank(container: &Element) -> bool {
    rank_widget(container).len() == 2
}

/// Rank of the comment, `None` when there is no rank widget.
///
/// A widget whose text holds no number is a malformed page and reported as
/// missing, never as a zero rank.
pub fn comment_rank(container: &Element) -> ExtractResult<Option<f64>> {
    let widget = rank_widget(container);
    if widget.len() != 2 {
        return Ok(None);
    }
    let text: String = widget.iter().map(|font| text_content(font)).collect();
    let found = RANK_PATTERN.find(&text).ok_or(missing("rank"))?;
    found
        .as_str()
        .replace(',', ".")
        .parse()
        .map(Some)
        .map_err(|_| ExtractError::InvalidValue {
            field: "rank",
            value: found.as_str().to_string(),
        })
}

/// Trimmed text of the whole container, byline included.
#[must_use]
pub fn comment_text(container: &Element) -> String {
    text_content(container).trim().to_string()
}

fn parse_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
