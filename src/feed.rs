//! RSS/Atom feed ingestion.
//!
//! Feed sources skip the browser entirely: one HTTP fetch, one parse, one
//! record per usable entry. Entries matching the newsletter/subscription
//! heuristics are dropped before persistence, as are entries with no link
//! (nothing to key the upsert on) or no usable body.

use std::sync::Arc;

use feed_rs::parser;
use tracing::{debug, info, instrument};

use crate::enrich::{self, FEED_QUOTE_CAP, Summarize};
use crate::error::IngestError;
use crate::models::{Community, Perspective};
use crate::normalize;
use crate::utils::{UNTITLED_ARTICLE, title_from_url};

/// One parsed feed entry, reduced to the fields the pipeline uses.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Entry content when present, otherwise the summary/description.
    pub body: Option<String>,
}

/// Fetch and parse a remote feed into entries.
#[instrument(level = "info", skip(http))]
pub async fn fetch_entries(
    http: &reqwest::Client,
    feed_url: &str,
) -> Result<Vec<FeedEntry>, IngestError> {
    let response = http
        .get(feed_url)
        .send()
        .await
        .map_err(|e| feed_failure(feed_url, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(feed_failure(feed_url, format!("status {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| feed_failure(feed_url, e.to_string()))?;

    let entries = parse_entries(feed_url, bytes.as_ref())?;
    info!(count = entries.len(), url = feed_url, "Parsed feed entries");
    Ok(entries)
}

fn parse_entries(feed_url: &str, bytes: &[u8]) -> Result<Vec<FeedEntry>, IngestError> {
    let feed = parser::parse(bytes).map_err(|e| feed_failure(feed_url, e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            body: entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content)),
        })
        .collect())
}

fn feed_failure(url: &str, reason: String) -> IngestError {
    IngestError::FeedFailure {
        url: url.to_string(),
        reason,
    }
}

/// Build a perspective from one feed entry.
///
/// Returns `None` for entries that are filtered as non-articles, lack a
/// link, or have no usable body. None of those produce records.
pub async fn build_entry_perspective(
    entry: FeedEntry,
    source_name: &str,
    community: Community,
    summarizer: Option<&Arc<dyn Summarize>>,
) -> Option<Perspective> {
    let link = entry.link?;

    let title = entry
        .title
        .map(|t| normalize::collapse_whitespace(&t))
        .filter(|t| !t.is_empty())
        .or_else(|| title_from_url(&link))
        .unwrap_or_else(|| UNTITLED_ARTICLE.to_string());

    if normalize::is_non_article(&title, &link) {
        debug!(%link, %title, "Dropping non-article feed entry");
        return None;
    }

    let content = normalize::normalize(&entry.body.unwrap_or_default());
    if content.is_empty() {
        debug!(%link, "Feed entry has no usable body; producing no record");
        return None;
    }

    let sentiment = enrich::sentiment::score(&content);
    let quote = enrich::build_quote(summarizer, &content, Some(FEED_QUOTE_CAP)).await;

    Some(Perspective::new(
        title,
        source_name.to_string(),
        community,
        quote,
        sentiment,
        link,
    ))
}
