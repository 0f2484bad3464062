use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use ff_core::{ArticleStorage, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod backends;

pub use backends::*;

/// Where ingested articles are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local, lost on exit.
    Memory,
    /// SQLite database file.
    Sqlite,
}

impl Default for StorageKind {
    fn default() -> Self {
        Self::Memory
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://crypto_news.db";

pub async fn create_storage(
    kind: StorageKind,
    database_url: Option<&str>,
) -> Result<Arc<dyn ArticleStorage>> {
    info!("💾 Using {} storage", kind);
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
            Ok(Arc::new(SqliteStorage::connect(url).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = database_url;
            Err(Error::Config(
                "SQLite storage requires the `sqlite` feature".to_string(),
            ))
        }
    }
}

/// Rejects a batch if any record breaks the table constraints.
pub(crate) fn validate_batch(records: &[ff_core::NewArticleRecord]) -> Result<()> {
    for record in records {
        record.validate().map_err(Error::Persistence)?;
    }
    Ok(())
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, StorageKind};
}
