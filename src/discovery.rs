//! Link discovery on HTML listing pages.
//!
//! Navigates to a source's listing URL, queries the configured listing
//! selector, and collects candidate article links. Relative hrefs resolve
//! against the listing URL; non-http(s) schemes are dropped; a link seen
//! twice in the same pass is discarded. That in-pass dedup only avoids
//! duplicate extraction work within one run; persistence-level idempotence
//! is the store's url-keyed upsert, not this.

use std::time::Duration;

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::IngestError;
use crate::session::Navigator;

/// Navigation budget for listing pages. Longer than the per-article budget;
/// front pages are heavy.
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(45);

/// Pause before the single listing-navigation retry.
const RETRY_DELAY: Duration = Duration::from_secs(2);

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Collect candidate article links from a listing page.
///
/// Navigation gets one retry after a timeout; a second failure propagates
/// and the caller skips the whole source for this run.
#[instrument(level = "info", skip(nav, listing_selector))]
pub async fn discover_links<N: Navigator + ?Sized>(
    nav: &N,
    listing_url: &str,
    listing_selector: &str,
) -> Result<Vec<String>, IngestError> {
    let html = match nav.fetch_page(listing_url, LISTING_TIMEOUT).await {
        Ok(html) => html,
        Err(IngestError::NavigationTimeout { .. }) => {
            warn!(url = listing_url, "Listing navigation timed out; retrying once");
            tokio::time::sleep(RETRY_DELAY).await;
            nav.fetch_page(listing_url, LISTING_TIMEOUT).await?
        }
        Err(e) => return Err(e),
    };

    let base = Url::parse(listing_url).map_err(|e| IngestError::NavigationFailed {
        url: listing_url.to_string(),
        reason: format!("unparseable listing url: {e}"),
    })?;
    let selector = Selector::parse(listing_selector)
        .map_err(|_| IngestError::SelectorInvalid(listing_selector.to_string()))?;

    let document = Html::parse_document(&html);
    let links = document
        .select(&selector)
        .filter_map(|element| {
            // The matched element may itself be the anchor, or wrap one.
            let href = element.value().attr("href").or_else(|| {
                element
                    .select(&ANCHOR)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            })?;
            let resolved = base.join(href).ok()?;
            matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
        })
        .unique()
        .collect::<Vec<_>>();

    info!(count = links.len(), url = listing_url, "Discovered article links");
    debug!(?links, "Candidate links");
    Ok(links)
}
