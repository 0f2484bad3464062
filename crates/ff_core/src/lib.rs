pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::{ImageGenerator, TextRewriter};
pub use storage::ArticleStorage;
pub use types::{
    CandidateArticle, DateStatus, EnrichedArticle, FeedFormat, NewArticleRecord,
    NormalizedArticle, PersistedArticle, RawFeedDocument, RewrittenCopy,
};
