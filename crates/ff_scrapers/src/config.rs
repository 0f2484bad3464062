use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use ff_core::{Error, FeedFormat, Result};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractOptions;

/// What happens to an article whose enrichment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OnEnrichmentFailure {
    /// Leave the article out of the persisted batch.
    Drop,
    /// Keep the article without the fields that failed.
    KeepPartial,
}

impl Default for OnEnrichmentFailure {
    fn default() -> Self {
        Self::Drop
    }
}

impl fmt::Display for OnEnrichmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::KeepPartial => write!(f, "keep-partial"),
        }
    }
}

impl FromStr for OnEnrichmentFailure {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "drop" => Ok(Self::Drop),
            "keep-partial" | "keepPartial" => Ok(Self::KeepPartial),
            other => Err(Error::Config(format!("Unknown enrichment failure policy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub format: FeedFormat,
    /// Maximum number of articles a run emits.
    pub cap: usize,
    pub min_title_len: usize,
    /// Lines after a Markdown link searched for the description.
    pub description_window: usize,
    /// Lines after a Markdown link searched for the author line.
    pub meta_window: usize,
    pub description_max_len: usize,
    pub generate_images: bool,
    pub rewrite_copy: bool,
    pub on_enrichment_failure: OnEnrichmentFailure,
    /// Concurrent enrichment calls; 1 runs them one after another.
    pub enrichment_concurrency: usize,
    pub persist: bool,
}

impl PipelineConfig {
    pub fn for_format(format: FeedFormat) -> Self {
        match format {
            FeedFormat::RssXml => Self {
                format,
                cap: 5,
                min_title_len: 10,
                description_window: 4,
                meta_window: 9,
                description_max_len: 100,
                generate_images: true,
                rewrite_copy: false,
                on_enrichment_failure: OnEnrichmentFailure::Drop,
                enrichment_concurrency: 3,
                persist: true,
            },
            FeedFormat::Markdown => Self {
                format,
                cap: 12,
                description_max_len: 200,
                ..Self::for_format(FeedFormat::RssXml)
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cap == 0 {
            return Err(Error::Config("cap must be at least 1".to_string()));
        }
        if self.description_window == 0 || self.meta_window == 0 {
            return Err(Error::Config("lookahead windows must be at least 1 line".to_string()));
        }
        if self.description_max_len <= crate::normalize::ELLIPSIS.chars().count() {
            return Err(Error::Config(format!(
                "description_max_len must be longer than the ellipsis, got {}",
                self.description_max_len
            )));
        }
        if self.enrichment_concurrency == 0 {
            return Err(Error::Config("enrichment_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            cap: self.cap,
            min_title_len: self.min_title_len,
            description_window: self.description_window,
            meta_window: self.meta_window,
        }
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.generate_images || self.rewrite_copy
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_format(FeedFormat::RssXml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_defaults() {
        let rss = PipelineConfig::for_format(FeedFormat::RssXml);
        assert_eq!(rss.cap, 5);
        assert_eq!(rss.description_max_len, 100);

        let md = PipelineConfig::for_format(FeedFormat::Markdown);
        assert_eq!(md.format, FeedFormat::Markdown);
        assert_eq!(md.cap, 12);
        assert_eq!(md.description_max_len, 200);
        assert_eq!(md.description_window, 4);
        assert_eq!(md.meta_window, 9);
        assert!(md.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let config = PipelineConfig {
            cap: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_tiny_description() {
        let config = PipelineConfig {
            description_max_len: 3,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("drop".parse::<OnEnrichmentFailure>().unwrap(), OnEnrichmentFailure::Drop);
        assert_eq!(
            "keepPartial".parse::<OnEnrichmentFailure>().unwrap(),
            OnEnrichmentFailure::KeepPartial
        );
        assert!("retry".parse::<OnEnrichmentFailure>().is_err());
        assert_eq!(OnEnrichmentFailure::KeepPartial.to_string(), "keep-partial");
    }
}
