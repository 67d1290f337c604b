//! Per-article extraction.
//!
//! Fetches one article URL in an isolated navigation context, runs the title
//! fallback chain, extracts and normalizes the body, enriches it, and builds
//! a [`Perspective`]. A timed-out navigation or an empty body produces no
//! record and no error; only connectivity loss escalates, so the run
//! controller can rebuild the session.

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use crate::enrich::{self, Summarize};
use crate::error::IngestError;
use crate::models::{Community, Perspective};
use crate::normalize;
use crate::session::Navigator;
use crate::utils::{UNTITLED_ARTICLE, title_from_url};

/// Navigation budget for a single article page.
pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the extractor needs besides the URL itself.
pub struct ArticleContext<'a> {
    pub source_name: &'a str,
    pub community: Community,
    pub title_selector: &'a str,
    pub content_selector: &'a str,
    pub summarizer: Option<&'a Arc<dyn Summarize>>,
}

/// Extract one article into a record.
///
/// The title falls back selector -> URL-derived -> `"Untitled Article"`,
/// first success wins. An article whose content normalizes to empty is not
/// persisted: this returns `Ok(None)` and the caller moves on.
#[instrument(level = "info", skip(nav, ctx))]
pub async fn extract_article<N: Navigator + ?Sized>(
    nav: &N,
    url: &str,
    ctx: &ArticleContext<'_>,
) -> Result<Option<Perspective>, IngestError> {
    let html = match nav.fetch_page(url, ARTICLE_TIMEOUT).await {
        Ok(html) => html,
        Err(e @ (IngestError::NavigationTimeout { .. } | IngestError::NavigationFailed { .. })) => {
            warn!(%url, error = %e, "Skipping article after failed navigation");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let title_selector = Selector::parse(ctx.title_selector)
        .map_err(|_| IngestError::SelectorInvalid(ctx.title_selector.to_string()))?;
    let content_selector = Selector::parse(ctx.content_selector)
        .map_err(|_| IngestError::SelectorInvalid(ctx.content_selector.to_string()))?;

    let document = Html::parse_document(&html);

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| normalize::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|t| !t.is_empty())
        .or_else(|| title_from_url(url))
        .unwrap_or_else(|| UNTITLED_ARTICLE.to_string());

    let content = match extract_body(&document, &content_selector, url) {
        Ok(content) => content,
        Err(e @ IngestError::ExtractionEmpty(_)) => {
            debug!(%url, error = %e, "Producing no record");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let sentiment = enrich::sentiment::score(&content);
    let quote = enrich::build_quote(ctx.summarizer, &content, None).await;

    Ok(Some(Perspective::new(
        title,
        ctx.source_name.to_string(),
        ctx.community,
        quote,
        sentiment,
        url.to_string(),
    )))
}

/// Join and normalize all content-selector matches. An article whose body
/// normalizes to empty is not persistable.
fn extract_body(
    document: &Html,
    content_selector: &Selector,
    url: &str,
) -> Result<String, IngestError> {
    let raw = document
        .select(content_selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");

    let content = normalize::normalize(&raw);
    if content.is_empty() {
        return Err(IngestError::ExtractionEmpty(url.to_string()));
    }
    Ok(content)
}
