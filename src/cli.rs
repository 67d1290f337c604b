//! Command-line interface definitions for the ingestion pipeline.
//!
//! All options can be provided via command-line flags or environment
//! variables. The database URL is the only mandatory setting; summarization
//! is enabled by configuring an endpoint and silently skipped otherwise.

use clap::Parser;

/// Command-line arguments for one ingestion run.
///
/// # Examples
///
/// ```sh
/// # Minimal: sources.yaml in the working directory, DATABASE_URL in the env
/// perspective_ingest
///
/// # Explicit sources file and summarization endpoint
/// perspective_ingest -s ./config/sources.yaml \
///     --summary-api-url https://api.openai.com/v1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the source registry YAML file
    #[arg(short, long, default_value = "sources.yaml")]
    pub sources: String,

    /// Postgres connection string for the perspectives store
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Base URL of an OpenAI-compatible API used for quote summarization
    #[arg(long, env = "SUMMARY_API_URL")]
    pub summary_api_url: Option<String>,

    /// API key for the summarization endpoint
    #[arg(long, env = "SUMMARY_API_KEY", hide_env_values = true)]
    pub summary_api_key: Option<String>,

    /// Model requested from the summarization endpoint
    #[arg(long, env = "SUMMARY_MODEL", default_value = "gpt-4o-mini")]
    pub summary_model: String,

    /// Minimum delay between article fetches, in milliseconds
    #[arg(long, default_value_t = 1_000)]
    pub article_delay_min_ms: u64,

    /// Maximum delay between article fetches, in milliseconds
    #[arg(long, default_value_t = 3_000)]
    pub article_delay_max_ms: u64,

    /// Minimum delay between sources, in milliseconds
    #[arg(long, default_value_t = 3_000)]
    pub source_delay_min_ms: u64,

    /// Maximum delay between sources, in milliseconds
    #[arg(long, default_value_t = 6_000)]
    pub source_delay_max_ms: u64,
}
