//! HTTP fetch and parse of source pages.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::markup::{find_by_tag, parse_html, text_content, Element};

static FIRST_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches pages from the source site and parses them into markup trees.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Build a fetcher with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch `url` and parse the body into a tree rooted at `<html>`.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or a body
    /// that cannot be read or decoded.
    pub async fn fetch_page(&self, url: &str) -> Result<Element, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(parse_html(&body))
    }

    /// Number of the newest article, read from the feed.
    ///
    /// Takes the text of the feed's first `item` and returns its first integer
    /// run. Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched or holds no number.
    pub async fn discover_latest_article(&self, feed_url: &str) -> Result<i64> {
        let feed = self
            .fetch_page(feed_url)
            .await
            .context("Failed to fetch feed")?;
        latest_article_in_feed(&feed).context("Failed to read latest article number from feed")
    }
}

/// First integer run in the text of the feed's first item.
///
/// # Errors
///
/// Returns an error if the feed has no item or the item has no number.
pub fn latest_article_in_feed(feed: &Element) -> Result<i64> {
    let item = find_by_tag(feed, "item")
        .into_iter()
        .next()
        .context("Feed has no items")?;
    let text = text_content(item);
    let digits = FIRST_INTEGER
        .find(&text)
        .context("First feed item contains no number")?;
    digits
        .as_str()
        .parse()
        .with_context(|| format!("Article number out of range: {}", digits.as_str()))
}
