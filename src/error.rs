//! Error taxonomy for the ingestion pipeline.
//!
//! Each stage reports its failures as values of [`IngestError`] and the run
//! controller is the only place that catches broadly. The variants map to the
//! pipeline's real failure modes: connectivity loss triggers a session
//! rebuild, navigation timeouts skip a single URL, empty extractions and
//! degraded enrichment are absorbed where they occur, persistence failures
//! skip one record, and missing configuration is the only fatal condition.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The browser session died underneath us. The run controller rebuilds
    /// the session; the current item may be skipped.
    #[error("browser session lost: {0}")]
    ConnectivityLost(String),

    /// Navigation did not settle within its budget. Retried once where the
    /// caller allows, then the URL is abandoned.
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// Navigation failed for a reason other than a timeout (bad URL, CDP
    /// command error). Treated like a timeout by the article path.
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// The page loaded but yielded no usable body text. Never surfaced past
    /// the extractor; the URL simply produces no record.
    #[error("no usable content at {0}")]
    ExtractionEmpty(String),

    /// Sentiment or summarization failed. Absorbed by the enrichment layer,
    /// which substitutes the degraded fallback value.
    #[error("{stage} degraded: {reason}")]
    EnrichmentDegraded { stage: &'static str, reason: String },

    /// A remote feed could not be fetched or parsed. Source-scoped; the
    /// sweep continues with the next source.
    #[error("feed {url} unavailable: {reason}")]
    FeedFailure { url: String, reason: String },

    /// The upsert transaction failed and rolled back. Record-scoped.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] sqlx::Error),

    /// A CSS selector from the source registry does not parse. Registry
    /// loading validates eagerly, so hitting this later means the
    /// configuration changed out from under us.
    #[error("invalid selector `{0}`")]
    SelectorInvalid(String),

    /// Mandatory startup configuration is absent or invalid. Fatal, aborts
    /// before any run begins.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    /// The browser session is in the wrong state for the requested
    /// operation (`open()` while active, page creation while closed).
    #[error("browser session not available: {0}")]
    SessionUnavailable(String),
}

impl IngestError {
    /// True for failures that warrant an immediate session rebuild.
    pub fn is_connectivity_lost(&self) -> bool {
        matches!(self, Self::ConnectivityLost(_))
    }
}
