use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::CRAWLER_USER_AGENT;

/// Placeholder substituted with the article number in [`Config::article_url_template`].
pub const NUM_PLACEHOLDER: &str = "{num}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Crawler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Source site
    pub article_url_template: String,
    pub feed_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,

    // Database
    pub database_path: PathBuf,

    // Worker pool
    pub worker_concurrency: usize,
    pub progress_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Source site
            article_url_template: required_env("ARTICLE_URL_TEMPLATE")?,
            feed_url: required_env("FEED_URL")?,
            user_agent: env_or_default("USER_AGENT", CRAWLER_USER_AGENT),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/stats.sqlite")),

            // Worker pool
            worker_concurrency: parse_env_usize("WORKER_CONCURRENCY", 8)?,
            progress_interval: Duration::from_secs(parse_env_u64("PROGRESS_INTERVAL_SECS", 5)?),
        })
    }

    /// Configuration pointing at a local test server.
    ///
    /// `base_url` is used for both the article pages (`{base_url}/article/{num}`)
    /// and the feed (`{base_url}/feed.rss`).
    #[must_use]
    pub fn for_testing(base_url: &str, database_path: PathBuf) -> Self {
        Self {
            article_url_template: format!("{base_url}/article/{NUM_PLACEHOLDER}"),
            feed_url: format!("{base_url}/feed.rss"),
            user_agent: CRAWLER_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            database_path,
            worker_concurrency: 4,
            progress_interval: Duration::from_secs(1),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "WORKER_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "PROGRESS_INTERVAL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.article_url_template.contains(NUM_PLACEHOLDER) {
            return Err(ConfigError::InvalidValue {
                name: "ARTICLE_URL_TEMPLATE".to_string(),
                message: format!("must contain the {NUM_PLACEHOLDER} placeholder"),
            });
        }
        if self.feed_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FEED_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// URL of the article page with the given number.
    #[must_use]
    pub fn article_url(&self, num: i64) -> String {
        self.article_url_template
            .replace(NUM_PLACEHOLDER, &num.to_string())
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "ARTICLE_URL_TEMPLATE",
            "FEED_URL",
            "USER_AGENT",
            "REQUEST_TIMEOUT_SECS",
            "DATABASE_PATH",
            "WORKER_CONCURRENCY",
            "PROGRESS_INTERVAL_SECS",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("ARTICLE_URL_TEMPLATE", "https://news.example.com/a/{num}");
        std::env::set_var("FEED_URL", "https://news.example.com/rss");

        let config = Config::from_env().unwrap();
        assert_eq!(config.worker_concurrency, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.database_path, PathBuf::from("./data/stats.sqlite"));
        assert!(config.validate().is_ok());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_template() {
        clear_env();
        std::env::set_var("FEED_URL", "https://news.example.com/rss");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "ARTICLE_URL_TEMPLATE"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_bad_integer() {
        clear_env();
        std::env::set_var("ARTICLE_URL_TEMPLATE", "https://news.example.com/a/{num}");
        std::env::set_var("FEED_URL", "https://news.example.com/rss");
        std::env::set_var("WORKER_CONCURRENCY", "many");

        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::ParseInt { .. })
        ));
        clear_env();
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            worker_concurrency: 0,
            ..Config::for_testing("http://localhost", PathBuf::from("x.sqlite"))
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_placeholder() {
        let config = Config {
            article_url_template: "http://localhost/article".to_string(),
            ..Config::for_testing("http://localhost", PathBuf::from("x.sqlite"))
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_article_url() {
        let config = Config::for_testing("http://localhost:8080", PathBuf::from("x.sqlite"));
        assert_eq!(config.article_url(42), "http://localhost:8080/article/42");
    }
}
