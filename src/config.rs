//! Run configuration.
//!
//! Everything the collector needs is carried by [`Config`]: credentials for both
//! upstream services, the forum to collect, the start date, the cap and the output path.
//! It is read from a TOML file and credentials can be overridden from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{Error, Result};

/// Root configuration of a collection run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Content API credentials.
    pub reddit: RedditConfig,

    /// Archive index settings
    #[serde(default)]
    pub pushshift: PushshiftConfig,

    /// What to collect
    #[serde(default)]
    pub collect: CollectConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default = "defaults::reddit_auth_url")]
    pub auth_url: String,
    #[serde(default = "defaults::reddit_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushshiftConfig {
    #[serde(default = "defaults::pushshift_url")]
    pub base_url: String,
    /// Bearer token, newer deployments of the index refuse anonymous queries.
    #[serde(default)]
    pub token: Option<String>,
    /// Hits requested per page.
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for PushshiftConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::pushshift_url(),
            token: None,
            page_size: defaults::page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "defaults::subreddit")]
    pub subreddit: String,
    /// Inclusive lower bound, midnight UTC.
    #[serde(default = "defaults::start_date")]
    pub start_date: NaiveDate,
    /// Maximum number of records written in one run.
    #[serde(default = "defaults::limit")]
    pub limit: usize,
    #[serde(default = "defaults::output")]
    pub output: PathBuf,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            subreddit: defaults::subreddit(),
            start_date: defaults::start_date(),
            limit: defaults::limit(),
            output: defaults::output(),
        }
    }
}

impl CollectConfig {
    /// The start date as epoch seconds.
    pub fn start_epoch(&self) -> i64 {
        self.start_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override credentials with the `REDDIT_*` and `PUSHSHIFT_TOKEN` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let reddit = &mut self.reddit;
        for (key, slot) in [
            ("REDDIT_CLIENT_ID", &mut reddit.client_id),
            ("REDDIT_CLIENT_SECRET", &mut reddit.client_secret),
            ("REDDIT_USERNAME", &mut reddit.username),
            ("REDDIT_PASSWORD", &mut reddit.password),
        ] {
            if let Some(value) = var(key) {
                log::debug!("{key} taken from the environment");
                *slot = value;
            }
        }
        if let Some(token) = var("PUSHSHIFT_TOKEN") {
            self.pushshift.token = Some(token);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let reddit = &self.reddit;
        for (name, value) in [
            ("reddit.client_id", &reddit.client_id),
            ("reddit.client_secret", &reddit.client_secret),
            ("reddit.username", &reddit.username),
            ("reddit.password", &reddit.password),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{name} is empty")));
            }
        }
        if self.collect.subreddit.trim().is_empty() {
            return Err(Error::config("collect.subreddit is empty"));
        }
        if self.pushshift.page_size == 0 {
            return Err(Error::config("pushshift.page_size must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(Error::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use crate::{DEFAULT_LIMIT, DEFAULT_OUTPUT, DEFAULT_PAGE_SIZE, DEFAULT_SUBREDDIT};

    pub fn reddit_auth_url() -> String {
        "https://www.reddit.com/api/v1/access_token".into()
    }

    pub fn reddit_api_url() -> String {
        "https://oauth.reddit.com".into()
    }

    pub fn pushshift_url() -> String {
        "https://api.pushshift.io".into()
    }

    pub fn page_size() -> usize {
        DEFAULT_PAGE_SIZE
    }

    pub fn subreddit() -> String {
        DEFAULT_SUBREDDIT.into()
    }

    // The day the default subreddit was created.
    pub fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2009, 8, 8).unwrap_or_default()
    }

    pub fn limit() -> usize {
        DEFAULT_LIMIT
    }

    pub fn output() -> PathBuf {
        PathBuf::from(DEFAULT_OUTPUT)
    }

    pub fn user_agent() -> String {
        concat!("corpus-collector/", env!("CARGO_PKG_VERSION")).into()
    }

    pub fn timeout() -> u64 {
        30
    }
}
