//! Run controller and extraction dispatcher.
//!
//! One run sweeps every source in registry order, strictly sequentially: one
//! source, one link, one article at a time, with jittered sleeps in between.
//! Per-source failures are caught here and never abort the sweep; the only
//! fatal condition in the whole program is invalid startup configuration.
//! The controller is also the place that reacts to connectivity loss by
//! rebuilding the browser session.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, rng};
use tracing::{error, info, instrument, warn};

use crate::config::{ExtractionProfile, SourceProfile, SourceRegistry};
use crate::discovery;
use crate::enrich::Summarize;
use crate::error::IngestError;
use crate::extract::{self, ArticleContext};
use crate::feed;
use crate::models::Perspective;
use crate::session::{Navigator, USER_AGENT};
use crate::store::PerspectiveWriter;
use crate::utils::truncate_quote;

/// Randomized anti-burst delays. Not correctness-critical, but kept as a
/// configurable policy so operators can tune per deployment.
#[derive(Debug, Clone)]
pub struct Pacing {
    article_delay_ms: Range<u64>,
    source_delay_ms: Range<u64>,
}

impl Pacing {
    /// Build a policy from millisecond bounds, repairing inverted ranges.
    pub fn new(article_min: u64, article_max: u64, source_min: u64, source_max: u64) -> Self {
        Self {
            article_delay_ms: Self::range(article_min, article_max),
            source_delay_ms: Self::range(source_min, source_max),
        }
    }

    /// No delays; used by tests.
    pub fn disabled() -> Self {
        Self::new(0, 0, 0, 0)
    }

    fn range(min: u64, max: u64) -> Range<u64> {
        if max > min { min..max } else { min..min + 1 }
    }

    async fn sleep_between_articles(&self) {
        Self::sleep_jittered(&self.article_delay_ms).await;
    }

    async fn sleep_between_sources(&self) {
        Self::sleep_jittered(&self.source_delay_ms).await;
    }

    async fn sleep_jittered(range: &Range<u64>) {
        let ms = rng().random_range(range.clone());
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

/// Counters for one sweep, reported at the end of the run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub records_upserted: usize,
    pub items_skipped: usize,
}

/// Drives one ingestion run over the source registry.
///
/// Owns the browser session and the store for the duration of the run; both
/// are released through [`Runner::shutdown`] and the caller's pool handle.
pub struct Runner<N: Navigator, S: PerspectiveWriter> {
    session: N,
    store: S,
    summarizer: Option<Arc<dyn Summarize>>,
    http: reqwest::Client,
    pacing: Pacing,
}

impl<N: Navigator, S: PerspectiveWriter> Runner<N, S> {
    pub fn new(session: N, store: S, summarizer: Option<Arc<dyn Summarize>>, pacing: Pacing) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            session,
            store,
            summarizer,
            http,
            pacing,
        }
    }

    /// Sweep every source in registry order. Infallible by design: failures
    /// are isolated per source (or per record) and counted.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&mut self, registry: &SourceRegistry) -> RunStats {
        let mut stats = RunStats::default();
        let total = registry.len();

        for (position, source) in registry.sources().iter().enumerate() {
            info!(
                source = %source.source_name,
                community = %source.community,
                position = position + 1,
                total,
                "Processing source"
            );

            match self.process_source(source, &mut stats).await {
                Ok(()) => stats.sources_ok += 1,
                Err(e) => {
                    stats.sources_failed += 1;
                    error!(source = %source.source_name, error = %e, "Source failed; continuing sweep");
                }
            }

            if !self.session.is_connected() {
                warn!("Browser disconnected; rebuilding session");
                if let Err(e) = self.session.recreate().await {
                    error!(error = %e, "Session rebuild failed; HTML sources may be skipped");
                }
            }

            if position + 1 < total {
                self.pacing.sleep_between_sources().await;
            }
        }

        stats
    }

    async fn process_source(
        &mut self,
        source: &SourceProfile,
        stats: &mut RunStats,
    ) -> Result<(), IngestError> {
        match &source.profile {
            ExtractionProfile::Feed { feed_url } => {
                self.process_feed(source, feed_url, stats).await
            }
            ExtractionProfile::Html {
                listing_selector,
                title_selector,
                content_selector,
            } => {
                self.process_listing(source, listing_selector, title_selector, content_selector, stats)
                    .await
            }
        }
    }

    async fn process_feed(
        &mut self,
        source: &SourceProfile,
        feed_url: &str,
        stats: &mut RunStats,
    ) -> Result<(), IngestError> {
        let entries = feed::fetch_entries(&self.http, feed_url).await?;

        for entry in entries {
            let built = feed::build_entry_perspective(
                entry,
                &source.source_name,
                source.community,
                self.summarizer.as_ref(),
            )
            .await;

            match built {
                Some(record) => self.persist(record, stats).await,
                None => stats.items_skipped += 1,
            }
        }

        Ok(())
    }

    async fn process_listing(
        &mut self,
        source: &SourceProfile,
        listing_selector: &str,
        title_selector: &str,
        content_selector: &str,
        stats: &mut RunStats,
    ) -> Result<(), IngestError> {
        let links =
            discovery::discover_links(&self.session, &source.origin_url, listing_selector).await?;
        let total = links.len();

        for (position, link) in links.into_iter().enumerate() {
            let ctx = ArticleContext {
                source_name: &source.source_name,
                community: source.community,
                title_selector,
                content_selector,
                summarizer: self.summarizer.as_ref(),
            };

            match extract::extract_article(&self.session, &link, &ctx).await {
                Ok(Some(record)) => self.persist(record, stats).await,
                Ok(None) => stats.items_skipped += 1,
                Err(e) if e.is_connectivity_lost() => {
                    warn!(url = %link, error = %e, "Connection lost mid-source; rebuilding and skipping item");
                    stats.items_skipped += 1;
                    self.session.recreate().await?;
                }
                Err(e) => return Err(e),
            }

            if position + 1 < total {
                self.pacing.sleep_between_articles().await;
            }
        }

        Ok(())
    }

    async fn persist(&self, record: Perspective, stats: &mut RunStats) {
        match self.store.upsert(&record).await {
            Ok(()) => {
                stats.records_upserted += 1;
                info!(
                    title = %truncate_quote(&record.title, 60),
                    url = %record.url,
                    "Upserted perspective"
                );
            }
            Err(e) => {
                stats.items_skipped += 1;
                error!(url = %record.url, error = %e, "Failed to persist record; continuing");
            }
        }
    }

    /// Release the browser session. The datastore pool is closed by the
    /// caller, which keeps its own handle.
    pub async fn shutdown(&mut self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceRegistry;
    use crate::testing::{FetchPlan, MemoryStore, ScriptedNavigator};

    const LISTING_A: &str = r#"
        <html><body>
          <article class="story"><a href="/a/one.html">One</a></article>
        </body></html>
    "#;

    const LISTING_B: &str = r#"
        <html><body>
          <article class="story"><a href="/b/one.html">One</a></article>
          <article class="story"><a href="/b/two.html">Two</a></article>
        </body></html>
    "#;

    const ARTICLE: &str = r#"
        <html><body>
          <h1 class="headline">A Headline</h1>
          <div class="body"><p>Enough body text to score and quote.</p></div>
        </body></html>
    "#;

    fn html_source(name: &str, origin: &str) -> String {
        format!(
            r#"
- origin_url: {origin}
  source_name: {name}
  community: center
  profile:
    kind: html
    listing_selector: "article.story"
    title_selector: ".headline"
    content_selector: ".body p"
"#
        )
    }

    fn registry(yaml: &str) -> SourceRegistry {
        let path = std::env::temp_dir().join(format!("sources-{}.yaml", uuid::Uuid::new_v4()));
        std::fs::write(&path, yaml).unwrap();
        let registry = SourceRegistry::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_does_not_abort_sweep() {
        // Source A's listing never loads; source B works end to end.
        let yaml = format!(
            "{}{}",
            html_source("Source A", "https://a.example.com"),
            html_source("Source B", "https://b.example.com")
        );
        let nav = ScriptedNavigator::new()
            .with_plan(
                "https://a.example.com",
                vec![FetchPlan::Timeout, FetchPlan::Timeout],
            )
            .with_page("https://b.example.com", LISTING_B)
            .with_page("https://b.example.com/b/one.html", ARTICLE)
            .with_page("https://b.example.com/b/two.html", ARTICLE);
        let store = MemoryStore::new();

        let mut runner = Runner::new(nav.clone(), store.clone(), None, Pacing::disabled());
        let stats = runner.run(&registry(&yaml)).await;

        assert_eq!(stats.sources_failed, 1);
        assert_eq!(stats.sources_ok, 1);
        assert_eq!(stats.records_upserted, 2);
        let mut urls = store.urls();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://b.example.com/b/one.html".to_string(),
                "https://b.example.com/b/two.html".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_mid_source_rebuilds_and_continues() {
        let yaml = html_source("Source B", "https://b.example.com");
        let nav = ScriptedNavigator::new()
            .with_page("https://b.example.com", LISTING_B)
            .with_plan(
                "https://b.example.com/b/one.html",
                vec![FetchPlan::Disconnect],
            )
            .with_page("https://b.example.com/b/two.html", ARTICLE);
        let store = MemoryStore::new();

        let mut runner = Runner::new(nav.clone(), store.clone(), None, Pacing::disabled());
        let stats = runner.run(&registry(&yaml)).await;

        // The dropped item is skipped; the rebuilt session finishes the rest.
        assert_eq!(nav.recreate_calls(), 1);
        assert_eq!(stats.records_upserted, 1);
        assert_eq!(stats.items_skipped, 1);
        assert_eq!(stats.sources_ok, 1);
        assert!(store.get("https://b.example.com/b/two.html").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failure_skips_record_only() {
        let yaml = html_source("Source A", "https://a.example.com");
        let nav = ScriptedNavigator::new()
            .with_page("https://a.example.com", LISTING_A)
            .with_page("https://a.example.com/a/one.html", ARTICLE);
        let store = MemoryStore::new();
        store.fail_upserts();

        let mut runner = Runner::new(nav, store.clone(), None, Pacing::disabled());
        let stats = runner.run(&registry(&yaml)).await;

        assert_eq!(stats.records_upserted, 0);
        assert_eq!(stats.items_skipped, 1);
        // A failed upsert is record-scoped, not a source failure.
        assert_eq!(stats.sources_ok, 1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_article_is_skipped_without_failing_source() {
        let yaml = html_source("Source B", "https://b.example.com");
        let nav = ScriptedNavigator::new()
            .with_page("https://b.example.com", LISTING_B)
            .with_plan("https://b.example.com/b/one.html", vec![FetchPlan::Timeout])
            .with_page("https://b.example.com/b/two.html", ARTICLE);
        let store = MemoryStore::new();

        let mut runner = Runner::new(nav, store.clone(), None, Pacing::disabled());
        let stats = runner.run(&registry(&yaml)).await;

        assert_eq!(stats.sources_ok, 1);
        assert_eq!(stats.records_upserted, 1);
        assert_eq!(stats.items_skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reingestion_is_idempotent_across_runs() {
        let yaml = html_source("Source A", "https://a.example.com");
        let nav = ScriptedNavigator::new()
            .with_page("https://a.example.com", LISTING_A)
            .with_page("https://a.example.com/a/one.html", ARTICLE);
        let store = MemoryStore::new();
        let registry = registry(&yaml);

        let mut runner = Runner::new(nav, store.clone(), None, Pacing::disabled());
        let first = runner.run(&registry).await;
        let second = runner.run(&registry).await;

        assert_eq!(first.records_upserted, 1);
        assert_eq!(second.records_upserted, 1);
        // Two runs, one logical row.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_pacing_repairs_inverted_range() {
        // Construction must not panic and sampling must stay in range.
        let pacing = Pacing::new(500, 100, 0, 0);
        assert_eq!(pacing.article_delay_ms, 500..501);
    }
}
