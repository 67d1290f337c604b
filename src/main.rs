//! # Perspective Ingest
//!
//! An ingestion pipeline that collects news articles from heterogeneous
//! sources (HTML listing pages driven through headless Chromium, and
//! RSS/Atom feeds), normalizes them into perspective records, scores their
//! sentiment, optionally summarizes them through an LLM, and upserts them
//! into the Postgres store consumed by the downstream search API.
//!
//! ## Usage
//!
//! ```sh
//! DATABASE_URL=postgres://... perspective_ingest -s sources.yaml
//! ```
//!
//! ## Architecture
//!
//! One run is a strictly sequential sweep:
//! 1. **Dispatch**: each source routes to feed parsing or listing crawling
//! 2. **Discovery**: listing pages yield deduplicated candidate links
//! 3. **Extraction**: one isolated navigation context per article, with a
//!    title fallback chain and an empty-content abort
//! 4. **Enrichment**: lexicon sentiment plus summarization with a degraded
//!    fallback
//! 5. **Persistence**: url-keyed idempotent upserts
//!
//! Per-source failures are isolated; a disconnected browser session is
//! rebuilt transparently; the only fatal error is missing configuration.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod discovery;
mod enrich;
mod error;
mod extract;
mod feed;
mod models;
mod normalize;
mod pipeline;
mod session;
mod store;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::SourceRegistry;
use enrich::{ChatSummarizer, RetrySummarize, Summarize};
use error::IngestError;
use pipeline::{Pacing, Runner};
use session::SessionManager;
use store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("perspective_ingest starting up");

    let args = Cli::parse();

    // --- Startup configuration; failures here are the only fatal ones ---
    let registry = SourceRegistry::load(&args.sources)?;

    let database_url = args.database_url.clone().ok_or_else(|| {
        IngestError::ConfigurationMissing("DATABASE_URL is not set".to_string())
    })?;
    let store = PgStore::connect(&database_url).await?;
    store.ensure_schema().await?;

    let summarizer: Option<Arc<dyn Summarize>> = match &args.summary_api_url {
        Some(base_url) => {
            info!(model = %args.summary_model, "Summarization enabled");
            let client =
                ChatSummarizer::new(base_url, args.summary_api_key.as_deref(), &args.summary_model);
            Some(Arc::new(RetrySummarize::new(
                client,
                2,
                Duration::from_secs(1),
            )))
        }
        None => {
            info!("No summarization endpoint configured; quotes fall back to extracted content");
            None
        }
    };

    let mut session = SessionManager::new();
    if let Err(e) = session.open().await {
        error!(error = %e, "Failed to launch browser session");
        store.close().await;
        return Err(e.into());
    }

    let pacing = Pacing::new(
        args.article_delay_min_ms,
        args.article_delay_max_ms,
        args.source_delay_min_ms,
        args.source_delay_max_ms,
    );

    // --- The sweep itself cannot fail; teardown always runs ---
    let store_handle = store.clone();
    let mut runner = Runner::new(session, store, summarizer, pacing);
    let stats = runner.run(&registry).await;
    runner.shutdown().await;
    store_handle.close().await;

    let elapsed = start_time.elapsed();
    info!(
        sources_ok = stats.sources_ok,
        sources_failed = stats.sources_failed,
        records_upserted = stats.records_upserted,
        items_skipped = stats.items_skipped,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Ingestion run complete"
    );

    Ok(())
}
