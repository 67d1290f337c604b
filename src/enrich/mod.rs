//! Enrichment: sentiment scoring and quote summarization.
//!
//! Both enrichment steps are independently fault-tolerant. Sentiment is a
//! pure local scorer and cannot fail; summarization calls out to an LLM and
//! degrades to the extracted content on any failure. Nothing in this module
//! ever escalates an error to the run controller.

pub mod sentiment;
pub mod summary;

pub use summary::{ChatSummarizer, RetrySummarize, Summarize};

use std::sync::Arc;

use tracing::warn;

use crate::utils::truncate_quote;

/// Upper bound requested from the summarizer.
pub const MAX_SUMMARY_SENTENCES: usize = 3;

/// Quote-length cap applied to feed-sourced entries when falling back to raw
/// content. The HTML article path has no cap.
pub const FEED_QUOTE_CAP: usize = 200;

/// Produce the stored quote for a record.
///
/// Uses the summarizer when one is configured and it succeeds; otherwise the
/// quote is the normalized content itself, truncated only when `cap` applies.
pub async fn build_quote(
    summarizer: Option<&Arc<dyn Summarize>>,
    normalized: &str,
    cap: Option<usize>,
) -> String {
    if let Some(s) = summarizer {
        match s.summarize(normalized, MAX_SUMMARY_SENTENCES).await {
            Ok(summary) => return summary,
            Err(e) => {
                warn!(error = %e, "Summarization failed; falling back to extracted content");
            }
        }
    }

    match cap {
        Some(max) => truncate_quote(normalized, max),
        None => normalized.to_string(),
    }
}
