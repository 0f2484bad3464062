use thiserror::Error;

use crate::types::FeedFormat;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to fetch {url}: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("No articles found in {format} document")]
    ExtractionEmpty { format: FeedFormat },

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Errors that every later run would hit again. A failed fetch or an
    /// offline store is not fatal; a bad setting or source URL is.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidUrl(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
