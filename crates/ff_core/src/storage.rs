use async_trait::async_trait;

use crate::types::{NewArticleRecord, PersistedArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Inserts a batch in one operation.
    ///
    /// Records whose `original_url` is already stored are skipped; only the
    /// rows actually inserted are returned. If any record violates a
    /// constraint the whole batch is rejected and nothing is written.
    async fn insert_articles(&self, records: &[NewArticleRecord]) -> Result<Vec<PersistedArticle>>;

    /// Most recent articles first. Records with an unparsed date sort last.
    async fn recent_articles(&self, limit: usize) -> Result<Vec<PersistedArticle>>;

    /// Number of stored articles
    async fn count(&self) -> Result<usize>;
}
