use ff_core::{Error, FeedFormat, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where a feed lives and how its pages are laid out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    pub name: String,
    pub rss_url: String,
    pub page_url: String,
    /// Prefix of a reader service that renders any page as Markdown.
    pub reader_prefix: String,
    /// Regex an article URL must match, without anchors.
    pub article_pattern: String,
    /// Text that introduces the author on Markdown meta lines.
    pub author_marker: String,
    pub default_author: String,
    /// Label used when an item carries no publication time.
    pub recent_label: String,
}

impl SourceProfile {
    pub fn investing_crypto() -> Self {
        Self {
            name: "Investing.com".to_string(),
            rss_url: "https://sa.investing.com/rss/news_301.rss".to_string(),
            page_url: "https://sa.investing.com/news/cryptocurrency-news".to_string(),
            reader_prefix: "https://r.jina.ai/".to_string(),
            article_pattern: r"https://sa\.investing\.com/news/cryptocurrency-news/article-\d+"
                .to_string(),
            author_marker: "بواسطة".to_string(),
            default_author: "Investing.com".to_string(),
            recent_label: "مؤخراً".to_string(),
        }
    }

    /// URL to fetch for the given format. Markdown goes through the reader.
    pub fn source_url(&self, format: FeedFormat) -> String {
        match format {
            FeedFormat::RssXml => self.rss_url.clone(),
            FeedFormat::Markdown => format!("{}{}", self.reader_prefix, self.page_url),
        }
    }

    /// Anchored article URL matcher.
    pub fn article_regex(&self) -> Result<Regex> {
        Regex::new(&format!("^(?:{})$", self.article_pattern))
            .map_err(|e| Error::Config(format!("Invalid article pattern: {}", e)))
    }
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self::investing_crypto()
    }
}
