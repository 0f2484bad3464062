use std::collections::HashSet;

use async_trait::async_trait;
use ff_core::{ArticleStorage, NewArticleRecord, PersistedArticle, Result};
use tokio::sync::RwLock;
use tracing::debug;

use crate::validate_batch;

#[derive(Default)]
struct MemoryStore {
    articles: Vec<PersistedArticle>,
    urls: HashSet<String>,
}

impl MemoryStore {
    fn insert(&mut self, record: &NewArticleRecord) -> Option<PersistedArticle> {
        if !self.urls.insert(record.original_url.clone()) {
            debug!("Already stored: {}", record.original_url);
            return None;
        }
        let row = PersistedArticle::from_record(record);
        self.articles.push(row.clone());
        Some(row)
    }
}

/// Article store held in process memory.
#[derive(Default)]
pub struct InMemoryStorage {
    store: RwLock<MemoryStore>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn insert_articles(&self, records: &[NewArticleRecord]) -> Result<Vec<PersistedArticle>> {
        validate_batch(records)?;
        let mut store = self.store.write().await;
        Ok(records.iter().filter_map(|record| store.insert(record)).collect())
    }

    async fn recent_articles(&self, limit: usize) -> Result<Vec<PersistedArticle>> {
        let store = self.store.read().await;
        let mut articles = store.articles.clone();
        articles.sort_by(PersistedArticle::display_order);
        articles.truncate(limit);
        Ok(articles)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.store.read().await.articles.len())
    }
}
