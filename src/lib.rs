//! Comment statistics crawler library.
//!
//! Crawls a range of numbered article pages from a news site, extracts the
//! article metadata and comment list from each page, and folds the comments
//! into per-article and per-user aggregates stored in SQLite.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod config;
pub mod constants;
pub mod crawl;
pub mod db;
pub mod extract;
pub mod fetch;
pub mod markup;
pub mod users;
