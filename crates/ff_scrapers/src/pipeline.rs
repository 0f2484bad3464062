use std::sync::Arc;

use chrono::Utc;
use ff_core::{
    ArticleStorage, EnrichedArticle, Error, ImageGenerator, NewArticleRecord, NormalizedArticle,
    PersistedArticle, Result, TextRewriter,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::enrich::{EnrichmentOutcome, Enricher};
use crate::extract::Extractor;
use crate::fetcher::{FeedFetcher, SourceRef};
use crate::normalize::normalize_article;
use crate::sources::SourceProfile;

/// Articles a run hands back: stored rows when a store is attached,
/// otherwise the enriched articles themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunArticles {
    Persisted(Vec<PersistedArticle>),
    Returned(Vec<EnrichedArticle>),
}

impl RunArticles {
    pub fn len(&self) -> usize {
        match self {
            RunArticles::Persisted(rows) => rows.len(),
            RunArticles::Returned(articles) => articles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Candidates found in the feed.
    pub candidates: usize,
    /// Articles left out by strict enrichment.
    pub dropped: usize,
    pub articles: RunArticles,
}

impl IngestReport {
    pub fn processed(&self) -> usize {
        self.articles.len()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    source: SourceRef,
    extractor: Extractor,
    fetcher: Arc<dyn FeedFetcher>,
    storage: Option<Arc<dyn ArticleStorage>>,
    images: Option<Arc<dyn ImageGenerator>>,
    rewriter: Option<Arc<dyn TextRewriter>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        profile: SourceProfile,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let source = SourceRef::for_profile(&profile, config.format);
        let extractor = Extractor::new(profile, config.extract_options())?;
        Ok(Self {
            config,
            source,
            extractor,
            fetcher,
            storage: None,
            images: None,
            rewriter: None,
        })
    }

    pub fn with_storage(mut self, storage: Arc<dyn ArticleStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Fetch, extract and normalize.
    ///
    /// An empty feed surfaces as [`Error::ExtractionEmpty`].
    pub async fn collect(&self) -> Result<Vec<NormalizedArticle>> {
        let document = self.fetcher.fetch_raw(&self.source).await?;
        let candidates = self.extractor.extract(&document)?;
        let now = Utc::now();
        Ok(candidates
            .into_iter()
            .map(|candidate| normalize_article(candidate, self.config.description_max_len, now))
            .collect())
    }

    /// Read-only run: no enrichment, nothing stored.
    pub async fn preview(&self) -> Result<Vec<NormalizedArticle>> {
        match self.collect().await {
            Err(Error::ExtractionEmpty { format }) => {
                warn!("Feed returned no {} articles", format);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Full run: fetch, extract, normalize, enrich, persist.
    #[instrument(level = "info", skip_all, fields(source = %self.source.url))]
    pub async fn ingest(&self) -> Result<IngestReport> {
        info!("📰 Starting ingest run");
        let articles = match self.collect().await {
            Ok(articles) => articles,
            Err(Error::ExtractionEmpty { format }) => {
                warn!("Feed returned no {} articles, nothing to ingest", format);
                return Ok(IngestReport {
                    candidates: 0,
                    dropped: 0,
                    articles: self.empty_articles(),
                });
            }
            Err(e) => return Err(e),
        };
        let candidates = articles.len();

        let EnrichmentOutcome { articles, dropped } = self.enrich(articles).await;

        let articles = match (&self.storage, self.config.persist) {
            (Some(storage), true) => {
                RunArticles::Persisted(self.persist(storage.as_ref(), &articles).await?)
            }
            _ => RunArticles::Returned(articles),
        };

        info!("✅ Ingest finished: {} of {} articles processed", articles.len(), candidates);
        Ok(IngestReport {
            candidates,
            dropped,
            articles,
        })
    }

    async fn enrich(&self, articles: Vec<NormalizedArticle>) -> EnrichmentOutcome {
        let mut enricher =
            Enricher::new(self.config.on_enrichment_failure, self.config.enrichment_concurrency);
        if self.config.generate_images {
            match &self.images {
                Some(images) => enricher = enricher.with_images(images.clone()),
                None => warn!("Image generation enabled but no generator configured"),
            }
        }
        if self.config.rewrite_copy {
            match &self.rewriter {
                Some(rewriter) => enricher = enricher.with_rewriter(rewriter.clone()),
                None => warn!("Copy rewriting enabled but no rewriter configured"),
            }
        }
        enricher.enrich_all(articles).await
    }

    async fn persist(
        &self,
        storage: &dyn ArticleStorage,
        articles: &[EnrichedArticle],
    ) -> Result<Vec<PersistedArticle>> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<NewArticleRecord> =
            articles.iter().map(EnrichedArticle::to_record).collect();
        info!("💾 Storing {} articles", records.len());
        let stored = storage.insert_articles(&records).await?;
        if stored.len() < records.len() {
            info!("{} articles were already stored", records.len() - stored.len());
        }
        Ok(stored)
    }

    fn empty_articles(&self) -> RunArticles {
        match (&self.storage, self.config.persist) {
            (Some(_), true) => RunArticles::Persisted(Vec::new()),
            _ => RunArticles::Returned(Vec::new()),
        }
    }
}
