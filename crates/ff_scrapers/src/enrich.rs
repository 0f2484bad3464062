use std::sync::Arc;

use ff_core::{EnrichedArticle, Error, ImageGenerator, NormalizedArticle, Result, TextRewriter};
use ff_inference::prompts::image_prompt;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::config::OnEnrichmentFailure;
use crate::logging::short;

#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    /// Articles in extraction order.
    pub articles: Vec<EnrichedArticle>,
    /// Articles left out because enrichment failed under [`OnEnrichmentFailure::Drop`].
    pub dropped: usize,
}

pub struct Enricher {
    images: Option<Arc<dyn ImageGenerator>>,
    rewriter: Option<Arc<dyn TextRewriter>>,
    on_failure: OnEnrichmentFailure,
    semaphore: Arc<Semaphore>,
}

impl Enricher {
    pub fn new(on_failure: OnEnrichmentFailure, concurrency: usize) -> Self {
        Self {
            images: None,
            rewriter: None,
            on_failure,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Enriches every article, at most `concurrency` at a time.
    pub async fn enrich_all(&self, articles: Vec<NormalizedArticle>) -> EnrichmentOutcome {
        let total = articles.len();
        let futures: Vec<_> = articles
            .into_iter()
            .enumerate()
            .map(|(i, article)| {
                let semaphore = self.semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return Err((
                                EnrichedArticle::from(article),
                                Error::Enrichment(e.to_string()),
                            ))
                        }
                    };
                    self.enrich_one(i + 1, total, article).await
                }
            })
            .collect();

        let mut outcome = EnrichmentOutcome::default();
        for result in join_all(futures).await {
            match (result, self.on_failure) {
                (Ok(article), _) => outcome.articles.push(article),
                (Err((_, e)), OnEnrichmentFailure::Drop) => {
                    warn!("Dropping article: {}", e);
                    outcome.dropped += 1;
                }
                (Err((partial, e)), OnEnrichmentFailure::KeepPartial) => {
                    warn!("Keeping article without enrichment: {}", e);
                    outcome.articles.push(partial);
                }
            }
        }

        info!(
            "✨ Enriched {}/{} articles ({} dropped)",
            outcome.articles.len(),
            total,
            outcome.dropped
        );
        outcome
    }

    /// On failure returns the article as far as it got, plus the error.
    #[instrument(level = "info", skip_all, fields(article = index, of = total))]
    async fn enrich_one(
        &self,
        index: usize,
        total: usize,
        article: NormalizedArticle,
    ) -> std::result::Result<EnrichedArticle, (EnrichedArticle, Error)> {
        let mut enriched = EnrichedArticle::from(article);
        let title = short(&enriched.title, 50);
        let mut failure = None;

        if let Some(images) = &self.images {
            info!("🎨 Generating image for: {}", title);
            match self.generate_image(images.as_ref(), &enriched.title).await {
                Ok(url) => enriched.image_url = Some(url),
                Err(e) => failure = Some(e),
            }
        }

        if let Some(rewriter) = &self.rewriter {
            if failure.is_none() || self.on_failure == OnEnrichmentFailure::KeepPartial {
                info!("🤖 Rewriting copy for: {}", title);
                match rewriter.rewrite_text(&enriched.title, &enriched.description).await {
                    Ok(copy) => enriched.apply_rewrite(copy),
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        match failure {
            None => Ok(enriched),
            Some(e) => Err((enriched, Error::Enrichment(format!("{}: {}", title, e)))),
        }
    }

    async fn generate_image(&self, images: &dyn ImageGenerator, title: &str) -> Result<String> {
        let url = images.generate_image(&image_prompt(title)).await?;
        if url.trim().is_empty() {
            return Err(Error::Enrichment("image URL missing from response".to_string()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use ff_core::{DateStatus, RewrittenCopy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn article(n: usize) -> NormalizedArticle {
        NormalizedArticle {
            title: format!("Crypto headline number {}", n),
            url: format!("https://sa.investing.com/news/cryptocurrency-news/article-{}", n),
            description: format!("Description {}", n),
            author: "Investing.com".to_string(),
            published_label: "مؤخراً".to_string(),
            published_at: Utc::now(),
            date_status: DateStatus::Unparsed,
            image_url: None,
        }
    }

    /// Fails for titles containing `fail_on`; later articles answer faster.
    struct MockImages {
        fail_on: Option<&'static str>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockImages {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for MockImages {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate_image(&self, prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(call as u64 * 5))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(needle) = self.fail_on {
                if prompt.contains(needle) {
                    return Err(Error::Enrichment("no image in response".to_string()));
                }
            }
            Ok(format!("https://images.example/{}.png", call))
        }
    }

    struct MockRewriter;

    #[async_trait]
    impl TextRewriter for MockRewriter {
        fn name(&self) -> &str {
            "mock"
        }

        async fn rewrite_text(&self, title: &str, description: &str) -> Result<RewrittenCopy> {
            Ok(RewrittenCopy {
                title: format!("رسمي: {}", title),
                description: format!("رسمي: {}", description),
            })
        }
    }

    #[tokio::test]
    async fn test_strict_drops_failed_article() {
        let images = Arc::new(MockImages::new(Some("number 2")));
        let enricher = Enricher::new(OnEnrichmentFailure::Drop, 3).with_images(images);
        let outcome = enricher.enrich_all((1..=3).map(article).collect()).await;

        assert_eq!(outcome.articles.len(), 2);
        assert_eq!(outcome.dropped, 1);
        assert!(outcome.articles[0].url.ends_with("article-1"));
        assert!(outcome.articles[1].url.ends_with("article-3"));
        assert!(outcome.articles.iter().all(|a| a.image_url.is_some()));
    }

    #[tokio::test]
    async fn test_lenient_keeps_failed_article_without_image() {
        let images = Arc::new(MockImages::new(Some("number 2")));
        let enricher = Enricher::new(OnEnrichmentFailure::KeepPartial, 3).with_images(images);
        let outcome = enricher.enrich_all((1..=3).map(article).collect()).await;

        assert_eq!(outcome.articles.len(), 3);
        assert_eq!(outcome.dropped, 0);
        assert!(outcome.articles[1].image_url.is_none());
        assert!(outcome.articles[0].image_url.is_some());
        assert!(outcome.articles[2].image_url.is_some());
    }

    #[tokio::test]
    async fn test_order_is_stable_and_concurrency_bounded() {
        let images = Arc::new(MockImages::new(None));
        let enricher = Enricher::new(OnEnrichmentFailure::Drop, 2).with_images(images.clone());
        let outcome = enricher.enrich_all((1..=6).map(article).collect()).await;

        let urls: Vec<_> = outcome.articles.iter().map(|a| a.url.clone()).collect();
        let expected: Vec<_> = (1..=6).map(|n| article(n).url).collect();
        assert_eq!(urls, expected);
        assert!(images.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(images.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_rewrite_applied() {
        let enricher =
            Enricher::new(OnEnrichmentFailure::Drop, 1).with_rewriter(Arc::new(MockRewriter));
        let outcome = enricher.enrich_all(vec![article(1)]).await;
        let enriched = &outcome.articles[0];
        assert!(enriched.rewritten);
        assert_eq!(enriched.title, "رسمي: Crypto headline number 1");
        assert!(enriched.image_url.is_none());
    }

    #[tokio::test]
    async fn test_lenient_keeps_feed_image_on_failure() {
        let images = Arc::new(MockImages::new(Some("number 1")));
        let enricher = Enricher::new(OnEnrichmentFailure::KeepPartial, 1).with_images(images);
        let mut input = article(1);
        input.image_url = Some("https://feed.example/enclosure.jpg".to_string());
        let outcome = enricher.enrich_all(vec![input]).await;
        assert_eq!(
            outcome.articles[0].image_url.as_deref(),
            Some("https://feed.example/enclosure.jpg")
        );
    }
}
