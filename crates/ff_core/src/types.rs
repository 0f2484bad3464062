use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedFormat {
    RssXml,
    Markdown,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFormat::RssXml => write!(f, "rss-xml"),
            FeedFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for FeedFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" | "rss-xml" | "xml" => Ok(FeedFormat::RssXml),
            "markdown" | "md" => Ok(FeedFormat::Markdown),
            other => Err(Error::Config(format!("Unknown feed format: {}", other))),
        }
    }
}

/// Raw body of a fetched feed. Lives for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RawFeedDocument {
    pub format: FeedFormat,
    pub body: String,
    pub status: u16,
}

impl RawFeedDocument {
    pub fn new(format: FeedFormat, body: impl Into<String>) -> Self {
        Self {
            format,
            body: body.into(),
            status: 200,
        }
    }
}

/// An extracted article that has not been cleaned up yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateArticle {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub author: String,
    pub published_label: String,
    /// Image shipped with the feed item (RSS enclosure).
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStatus {
    Parsed,
    /// The label could not be read; `published_at` holds the run clock.
    Unparsed,
}

impl Default for DateStatus {
    fn default() -> Self {
        Self::Parsed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub title: String,
    pub url: String,
    pub description: String,
    pub author: String,
    pub published_label: String,
    pub published_at: DateTime<Utc>,
    pub date_status: DateStatus,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenCopy {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub author: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub date_status: DateStatus,
    pub rewritten: bool,
}

impl From<NormalizedArticle> for EnrichedArticle {
    fn from(article: NormalizedArticle) -> Self {
        Self {
            title: article.title,
            description: article.description,
            url: article.url,
            author: article.author,
            image_url: article.image_url,
            published_at: article.published_at,
            date_status: article.date_status,
            rewritten: false,
        }
    }
}

impl EnrichedArticle {
    pub fn apply_rewrite(&mut self, copy: RewrittenCopy) {
        self.title = copy.title;
        self.description = copy.description;
        self.rewritten = true;
    }

    pub fn to_record(&self) -> NewArticleRecord {
        NewArticleRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            original_url: self.url.clone(),
            image_url: self.image_url.clone(),
            published_at: self.published_at,
            date_status: self.date_status,
        }
    }
}

/// A row waiting to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticleRecord {
    pub title: String,
    pub description: String,
    pub original_url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub date_status: DateStatus,
}

impl NewArticleRecord {
    /// Checks the constraints every store enforces on insert.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("title must not be empty ({})", self.original_url));
        }
        if self.original_url.trim().is_empty() {
            return Err(format!("original_url must not be empty ({})", self.title));
        }
        url::Url::parse(&self.original_url)
            .map_err(|e| format!("original_url {} is not a URL: {}", self.original_url, e))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    pub original_url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub date_status: DateStatus,
}

impl PersistedArticle {
    pub fn from_record(record: &NewArticleRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            original_url: record.original_url.clone(),
            image_url: record.image_url.clone(),
            published_at: record.published_at,
            date_status: record.date_status,
        }
    }

    /// Display ordering: parsed dates newest first, then unparsed ones.
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        let rank = |s: DateStatus| match s {
            DateStatus::Parsed => 0,
            DateStatus::Unparsed => 1,
        };
        rank(a.date_status)
            .cmp(&rank(b.date_status))
            .then_with(|| b.published_at.cmp(&a.published_at))
    }
}
