//! Data models for ingested news perspectives.
//!
//! A [`Perspective`] is the unit of persistence: one normalized article or
//! feed entry tied to a source and a community-leaning tag. Its `url` is the
//! sole identity key; re-ingesting the same URL resolves to the same logical
//! row via upsert, never a duplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Editorial-leaning classification of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Community {
    Left,
    Center,
    Right,
}

impl Community {
    pub fn as_str(&self) -> &'static str {
        match self {
            Community::Left => "left",
            Community::Center => "center",
            Community::Right => "right",
        }
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized article record, as written to the perspectives table.
///
/// Created by the article extractor or the feed path; mutated only by
/// re-ingestion (upsert on `url`); never deleted by this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perspective {
    /// Generated identifier. Stable across re-ingestions of the same `url`.
    pub id: Uuid,
    /// Article headline. Never empty; falls back to a URL-derived title.
    pub title: String,
    /// Display name of the originating source.
    pub source: String,
    /// Community tag inherited from the source profile.
    pub community: Community,
    /// Normalized summary or excerpt. LLM-produced when summarization is
    /// configured and healthy, raw extracted content otherwise.
    pub quote: String,
    /// Polarity score in [-1.0, 1.0]; negative means negative tone.
    pub sentiment: f32,
    /// Canonical article URL. Unique identity key in the store.
    pub url: String,
    /// When this ingestion pass scraped the article.
    pub scraped_at: DateTime<Utc>,
}

impl Perspective {
    /// Build a record with a fresh identifier and the current timestamp.
    pub fn new(
        title: String,
        source: String,
        community: Community,
        quote: String,
        sentiment: f32,
        url: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            source,
            community,
            quote,
            sentiment,
            url,
            scraped_at: Utc::now(),
        }
    }
}
