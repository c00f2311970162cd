use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("{service} answered with status {status}")]
    UpstreamStatus {
        service: &'static str,
        status: StatusCode,
    },
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Couldn't decode an upstream payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Creation time {0} can't be represented as a calendar timestamp")]
    InvalidTimestamp(f64),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Couldn't parse the configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
