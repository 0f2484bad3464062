use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ff_core::{ArticleStorage, DateStatus, Error, NewArticleRecord, PersistedArticle, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::validate_batch;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS crypto_news (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL CHECK (length(trim(title)) > 0),
        description TEXT NOT NULL,
        original_url TEXT NOT NULL UNIQUE CHECK (length(trim(original_url)) > 0),
        image_url TEXT,
        published_at TEXT NOT NULL,
        date_unparsed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS crypto_news_display
        ON crypto_news (date_unparsed ASC, published_at DESC)
    "#,
];

fn persistence(what: &str, e: sqlx::Error) -> Error {
    Error::Persistence(format!("{}: {}", what, e))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `url`, e.g. `sqlite://news.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::Config(format!("Invalid database URL {}: {}", url, e)))?
            .create_if_missing(true);
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await
            .map_err(|e| persistence("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| persistence(&format!("Failed to run migration {}", i), e))?;
        }

        info!("💾 SQLite storage ready at {}", url);
        Ok(Self { pool })
    }

    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::connect(&format!("sqlite://{}", db_path.display())).await
    }

    fn row_to_article(row: &SqliteRow) -> Result<PersistedArticle> {
        let published_at: String = row.get("published_at");
        let published_at = DateTime::parse_from_rfc3339(&published_at)
            .map_err(|e| Error::Persistence(format!("Bad published_at {}: {}", published_at, e)))?
            .with_timezone(&Utc);
        let unparsed: bool = row.get("date_unparsed");

        Ok(PersistedArticle {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            original_url: row.get("original_url"),
            image_url: row.get("image_url"),
            published_at,
            date_status: if unparsed {
                DateStatus::Unparsed
            } else {
                DateStatus::Parsed
            },
        })
    }
}

#[async_trait]
impl ArticleStorage for SqliteStorage {
    async fn insert_articles(&self, records: &[NewArticleRecord]) -> Result<Vec<PersistedArticle>> {
        validate_batch(records)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("Failed to start transaction", e))?;
        let created_at = timestamp(&Utc::now());
        let mut stored = Vec::with_capacity(records.len());

        for record in records {
            let row = PersistedArticle::from_record(record);
            let result = sqlx::query(
                r#"
                INSERT INTO crypto_news
                (id, title, description, original_url, image_url, published_at, date_unparsed, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(original_url) DO NOTHING
                "#,
            )
            .bind(&row.id)
            .bind(&row.title)
            .bind(&row.description)
            .bind(&row.original_url)
            .bind(row.image_url.as_deref())
            .bind(timestamp(&row.published_at))
            .bind(row.date_status == DateStatus::Unparsed)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| persistence("Failed to store article", e))?;

            if result.rows_affected() == 0 {
                debug!("Already stored: {}", row.original_url);
            } else {
                stored.push(row);
            }
        }

        tx.commit()
            .await
            .map_err(|e| persistence("Failed to commit articles", e))?;
        Ok(stored)
    }

    async fn recent_articles(&self, limit: usize) -> Result<Vec<PersistedArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM crypto_news
            ORDER BY date_unparsed ASC, published_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| persistence("Failed to load articles", e))?;

        rows.iter().map(Self::row_to_article).collect()
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM crypto_news")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| persistence("Failed to count articles", e))?;
        Ok(count as usize)
    }
}
