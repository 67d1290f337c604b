//! Persistence gateway for the perspectives table.
//!
//! The single write operation is an idempotent, url-keyed upsert. Conflict
//! policy: last write wins on every mutable column (`title`, `source`,
//! `community`, `quote`, `sentiment`, `scraped_at`); `id` keeps its
//! first-insert value so the read-side API's comment references stay valid.
//! The related `comments` table belongs to the read-side API and is never
//! touched here.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use crate::error::IngestError;
use crate::models::Perspective;

/// The pipeline's write seam. One implementation talks to Postgres; tests
/// substitute an in-memory writer.
#[async_trait]
pub trait PerspectiveWriter: Send + Sync {
    /// Insert the record, or update the mutable columns when its `url` is
    /// already stored. A failure rolls back and affects only this record.
    async fn upsert(&self, record: &Perspective) -> Result<(), IngestError>;
}

/// Postgres-backed perspective store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(level = "info", skip_all)]
    pub async fn connect(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        info!("Connected to perspectives database");
        Ok(Self { pool })
    }

    /// Create the perspectives table when absent.
    pub async fn ensure_schema(&self) -> Result<(), IngestError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS perspectives (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                community TEXT NOT NULL,
                quote TEXT NOT NULL,
                sentiment REAL NOT NULL,
                url TEXT NOT NULL UNIQUE,
                scraped_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Release the connection pool. Called once at the end of a run.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

#[async_trait]
impl PerspectiveWriter for PgStore {
    #[instrument(level = "debug", skip_all, fields(url = %record.url))]
    async fn upsert(&self, record: &Perspective) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO perspectives (id, title, source, community, quote, sentiment, url, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (url) DO UPDATE SET
                title = EXCLUDED.title,
                source = EXCLUDED.source,
                community = EXCLUDED.community,
                quote = EXCLUDED.quote,
                sentiment = EXCLUDED.sentiment,
                scraped_at = EXCLUDED.scraped_at
            "#,
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.source)
        .bind(record.community.as_str())
        .bind(&record.quote)
        .bind(record.sentiment)
        .bind(&record.url)
        .bind(record.scraped_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
