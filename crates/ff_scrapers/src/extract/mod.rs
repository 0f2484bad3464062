//! Turns a raw feed document into candidate articles.
//!
//! Both formats are scanned forward once, in document order, and scanning
//! stops as soon as `cap` candidates have been emitted. Items that do not
//! look like articles are skipped one by one; they never fail the pass.

use ff_core::{CandidateArticle, Error, FeedFormat, RawFeedDocument, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::sources::SourceProfile;

mod markdown;
mod rss;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub cap: usize,
    pub min_title_len: usize,
    pub description_window: usize,
    pub meta_window: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            cap: 5,
            min_title_len: 10,
            description_window: 4,
            meta_window: 9,
        }
    }
}

pub struct Extractor {
    profile: SourceProfile,
    options: ExtractOptions,
    article_url: Regex,
    markdown: markdown::MarkdownPatterns,
}

impl Extractor {
    pub fn new(profile: SourceProfile, options: ExtractOptions) -> Result<Self> {
        let article_url = profile.article_regex()?;
        let markdown = markdown::MarkdownPatterns::new(&profile)?;
        Ok(Self {
            profile,
            options,
            article_url,
            markdown,
        })
    }

    /// Extracts candidates in document order.
    ///
    /// Returns [`Error::ExtractionEmpty`] when the document holds no article
    /// at all, so callers can tell a dead feed from a filtered one.
    pub fn extract(&self, document: &RawFeedDocument) -> Result<Vec<CandidateArticle>> {
        let candidates = match document.format {
            FeedFormat::RssXml => rss::extract_items(self, &document.body),
            FeedFormat::Markdown => markdown::MarkdownScanner::new(self).scan(&document.body),
        };

        if candidates.is_empty() {
            debug!("Document had {} bytes and no articles", document.body.len());
            return Err(Error::ExtractionEmpty {
                format: document.format,
            });
        }

        info!("🔎 Extracted {} {} articles", candidates.len(), document.format);
        Ok(candidates)
    }

    fn title_ok(&self, title: &str) -> bool {
        title.chars().count() >= self.options.min_title_len
    }

    fn url_ok(&self, url: &str) -> bool {
        url::Url::parse(url).is_ok() && self.article_url.is_match(url)
    }
}
