use ff_core::{CandidateArticle, Result};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::Extractor;
use crate::sources::SourceProfile;

lazy_static! {
    /// "Reuters - " style source prefix in front of a description.
    static ref SOURCE_PREFIX: Regex = Regex::new(r"^[A-Za-z][A-Za-z.]*\s+-\s+").unwrap();
}

/// Line patterns that depend on the source profile.
pub(super) struct MarkdownPatterns {
    link: Regex,
    meta: Regex,
    author_marker: String,
}

impl MarkdownPatterns {
    pub(super) fn new(profile: &SourceProfile) -> Result<Self> {
        let link = Regex::new(&format!(
            r"^[-*]\s*\[(.*?)\]\(({})\)",
            profile.article_pattern
        ))
        .map_err(|e| ff_core::Error::Config(format!("Invalid article pattern: {}", e)))?;
        let meta = Regex::new(&format!(
            r"^(?:[-*]\s*)?{}\s*(.*?)\s*•\s*(.*?)\s*$",
            regex::escape(&profile.author_marker)
        ))
        .map_err(|e| ff_core::Error::Config(format!("Invalid author marker: {}", e)))?;
        Ok(Self {
            link,
            meta,
            author_marker: profile.author_marker.clone(),
        })
    }
}

/// An article link whose description and meta line are still being looked for.
#[derive(Debug, Clone, PartialEq)]
struct Pending {
    title: String,
    url: String,
    link_line: usize,
    description: Option<String>,
    meta: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
enum ScanState {
    ScanningForLink,
    AwaitingDescription(Pending),
    AwaitingMeta(Pending),
}

pub(super) struct MarkdownScanner<'a> {
    extractor: &'a Extractor,
    patterns: &'a MarkdownPatterns,
    emitted: Vec<CandidateArticle>,
}

impl<'a> MarkdownScanner<'a> {
    pub(super) fn new(extractor: &'a Extractor) -> Self {
        Self {
            extractor,
            patterns: &extractor.markdown,
            emitted: Vec::new(),
        }
    }

    pub(super) fn scan(mut self, body: &str) -> Vec<CandidateArticle> {
        let cap = self.extractor.options.cap;
        let mut state = ScanState::ScanningForLink;

        for (index, line) in body.lines().enumerate() {
            state = self.step(state, index, line.trim());
            if self.emitted.len() >= cap {
                return self.emitted;
            }
        }

        // End of input: a candidate that already has its description is complete.
        if let ScanState::AwaitingMeta(pending) = state {
            self.emit(pending);
        }
        self.emitted
    }

    fn step(&mut self, state: ScanState, index: usize, line: &str) -> ScanState {
        let options = self.extractor.options;

        match state {
            ScanState::ScanningForLink => match self.match_link(index, line) {
                Some(pending) => ScanState::AwaitingDescription(pending),
                None => ScanState::ScanningForLink,
            },

            ScanState::AwaitingDescription(mut pending) => {
                if let Some(next) = self.match_link(index, line) {
                    debug!("No description for {:?}, skipping", pending.title);
                    return ScanState::AwaitingDescription(next);
                }
                let offset = index - pending.link_line;
                if offset <= options.meta_window {
                    if let Some(meta) = self.match_meta(line) {
                        pending.meta = Some(meta);
                    }
                }
                if self.is_description(line) {
                    pending.description = Some(strip_source_prefix(line));
                    if pending.meta.is_some() {
                        self.emit(pending);
                        return ScanState::ScanningForLink;
                    }
                    return self.await_meta(pending, offset);
                }
                if offset >= options.description_window {
                    debug!("No description within {} lines for {:?}", offset, pending.title);
                    return ScanState::ScanningForLink;
                }
                ScanState::AwaitingDescription(pending)
            }

            ScanState::AwaitingMeta(mut pending) => {
                if let Some(next) = self.match_link(index, line) {
                    self.emit(pending);
                    return ScanState::AwaitingDescription(next);
                }
                let offset = index - pending.link_line;
                if let Some(meta) = self.match_meta(line) {
                    pending.meta = Some(meta);
                    self.emit(pending);
                    return ScanState::ScanningForLink;
                }
                self.await_meta(pending, offset)
            }
        }
    }

    /// Keeps waiting for the meta line unless the window is used up.
    fn await_meta(&mut self, pending: Pending, offset: usize) -> ScanState {
        if offset >= self.extractor.options.meta_window {
            self.emit(pending);
            ScanState::ScanningForLink
        } else {
            ScanState::AwaitingMeta(pending)
        }
    }

    fn match_link(&self, index: usize, line: &str) -> Option<Pending> {
        let caps = self.patterns.link.captures(line)?;
        let title = caps[1].trim().to_string();
        let url = caps[2].trim().to_string();
        if !self.extractor.title_ok(&title) || !self.extractor.url_ok(&url) {
            debug!("Line {} links to an article but fails validation", index);
            return None;
        }
        Some(Pending {
            title,
            url,
            link_line: index,
            description: None,
            meta: None,
        })
    }

    fn match_meta(&self, line: &str) -> Option<(String, String)> {
        let caps = self.patterns.meta.captures(line)?;
        Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
    }

    fn is_description(&self, line: &str) -> bool {
        !line.is_empty()
            && !line.starts_with('-')
            && !line.starts_with('*')
            && !line.starts_with('#')
            && !line.contains(&self.patterns.author_marker)
    }

    fn emit(&mut self, pending: Pending) {
        let Some(description) = pending.description else {
            return;
        };
        let profile = &self.extractor.profile;
        let (author, published_label) = pending
            .meta
            .filter(|(author, _)| !author.is_empty())
            .unwrap_or_else(|| (profile.default_author.clone(), profile.recent_label.clone()));

        self.emitted.push(CandidateArticle {
            title: pending.title,
            url: pending.url,
            description: Some(description),
            author,
            published_label,
            image_url: None,
        });
    }
}

fn strip_source_prefix(line: &str) -> String {
    SOURCE_PREFIX.replace(line, "").trim().to_string()
}
