use std::time::Duration;

use async_trait::async_trait;
use ff_core::{Error, FeedFormat, RawFeedDocument, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, error, info};
use url::Url;

use crate::sources::SourceProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    pub format: FeedFormat,
}

impl SourceRef {
    pub fn new(url: impl Into<String>, format: FeedFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    pub fn for_profile(profile: &SourceProfile, format: FeedFormat) -> Self {
        Self::new(profile.source_url(format), format)
    }
}

/// Retrieves the raw feed text. One request, no retries.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_raw(&self, source: &SourceRef) -> Result<RawFeedDocument>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ff-news/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn fetch_error(source: &SourceRef, status: Option<u16>, message: String) -> Error {
        Error::Fetch {
            url: source.url.clone(),
            status,
            message,
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_raw(&self, source: &SourceRef) -> Result<RawFeedDocument> {
        let url = Url::parse(&source.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", source.url, e)))?;

        info!("📡 Fetching {} feed from {}", source.format, url);
        let mut request = self.client.get(url);
        if source.format == FeedFormat::Markdown {
            request = request.header(ACCEPT, "text/plain");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::fetch_error(source, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!("Feed request failed with {}", status);
            return Err(Self::fetch_error(
                source,
                Some(status.as_u16()),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::fetch_error(source, Some(status.as_u16()), e.to_string()))?;
        debug!("Received {} bytes", body.len());

        Ok(RawFeedDocument {
            format: source.format,
            body,
            status: status.as_u16(),
        })
    }
}
