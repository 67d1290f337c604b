//! Source registry: the immutable list of news sources to ingest.
//!
//! Sources load once at startup from a YAML file and are never mutated.
//! Each profile carries its extraction strategy as data (a feed URL, or a
//! set of CSS selectors for listing-page crawling), so the dispatcher
//! branches on a closed enum and no site-specific code exists anywhere.
//!
//! # File format
//!
//! ```yaml
//! - origin_url: https://www.example-news.com
//!   source_name: Example News
//!   community: center
//!   profile:
//!     kind: html
//!     listing_selector: "article.story a[href]"
//!     title_selector: ".headline"
//!     content_selector: ".article-body p"
//! - origin_url: https://feeds.example.org/world
//!   source_name: Example World
//!   community: left
//!   profile:
//!     kind: feed
//!     feed_url: https://feeds.example.org/world/rss.xml
//! ```

use std::fs;

use scraper::Selector;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::IngestError;
use crate::models::Community;

/// One configured news source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceProfile {
    /// Site root (HTML sources navigate here to find the listing).
    pub origin_url: String,
    /// Display name stored on every record from this source.
    pub source_name: String,
    /// Editorial-leaning tag inherited by every record.
    pub community: Community,
    /// How to pull content out of this source.
    pub profile: ExtractionProfile,
}

/// Extraction strategy for a source. Closed set; the dispatcher's branch is
/// exhaustive.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractionProfile {
    /// Parse a remote RSS/Atom feed and build one record per entry.
    Feed { feed_url: String },
    /// Crawl the listing page for article links, then extract each article.
    Html {
        listing_selector: String,
        title_selector: String,
        content_selector: String,
    },
}

/// Ordered, immutable sequence of source profiles.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: Vec<SourceProfile>,
}

impl SourceRegistry {
    /// Load and validate the registry. Any problem here (unreadable file,
    /// malformed YAML, bad URL, unparseable selector) is fatal startup
    /// configuration, not a runtime error.
    pub fn load(path: &str) -> Result<Self, IngestError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            IngestError::ConfigurationMissing(format!("cannot read sources file {path}: {e}"))
        })?;
        let sources = Self::parse(&raw)
            .map_err(|reason| IngestError::ConfigurationMissing(format!("{path}: {reason}")))?;

        info!(count = sources.len(), path, "Loaded source registry");
        Ok(Self { sources })
    }

    fn parse(raw: &str) -> Result<Vec<SourceProfile>, String> {
        let sources: Vec<SourceProfile> =
            serde_yaml::from_str(raw).map_err(|e| format!("invalid sources file: {e}"))?;
        if sources.is_empty() {
            return Err("sources file lists no sources".to_string());
        }
        for source in &sources {
            source.validate()?;
        }
        Ok(sources)
    }

    pub fn sources(&self) -> &[SourceProfile] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceProfile {
    fn validate(&self) -> Result<(), String> {
        Url::parse(&self.origin_url)
            .map_err(|e| format!("{}: bad origin_url: {e}", self.source_name))?;

        match &self.profile {
            ExtractionProfile::Feed { feed_url } => {
                Url::parse(feed_url)
                    .map_err(|e| format!("{}: bad feed_url: {e}", self.source_name))?;
            }
            ExtractionProfile::Html {
                listing_selector,
                title_selector,
                content_selector,
            } => {
                for selector in [listing_selector, title_selector, content_selector] {
                    Selector::parse(selector).map_err(|_| {
                        format!("{}: invalid selector `{selector}`", self.source_name)
                    })?;
                }
            }
        }
        Ok(())
    }
}
