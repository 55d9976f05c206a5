//! Shared constants used across the application.
//!
//! The class, id and attribute markers describe the fixed page layout of the
//! source site. Listing pages and single-article pages share the same
//! template; they differ only in which of these markers are present.

/// User agent string sent with every request to the source site.
pub const CRAWLER_USER_AGENT: &str = "comment-stats-crawler/0.1";

/// Class of the element holding the article headline.
pub const PAGE_TITLE_CLASS: &str = "page_title";

/// Class of the element holding the article summary line (contains the publish date).
pub const ARTICLE_SUMMARY_CLASS: &str = "article_summary";

/// Class carried only by listing pages.
pub const BOX_TITLE_CLASS: &str = "box_title";

/// `property` value of the meta tag whose `content` is the canonical article URL.
pub const CANONICAL_URL_PROPERTY: &str = "og:url";

/// Id of the element wrapping the comment section.
pub const COMMENTS_BODY_ID: &str = "body";

/// `cellspacing` value of the comment table.
pub const COMMENTS_TABLE_CELLSPACING: &str = "10";

/// `bgcolor` value of each comment cell.
pub const COMMENT_CELL_BGCOLOR: &str = "#ffffff";
