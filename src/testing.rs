//! Shared test fixtures: a scripted navigator, an in-memory perspective
//! writer, and canned summarizers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::enrich::Summarize;
use crate::error::IngestError;
use crate::models::Perspective;
use crate::session::Navigator;
use crate::store::PerspectiveWriter;

/// What the scripted navigator does for one `fetch_page` call.
pub enum FetchPlan {
    Page(String),
    Timeout,
    /// Fail with `ConnectivityLost` and mark the session disconnected.
    Disconnect,
}

#[derive(Default)]
struct NavigatorState {
    /// Repeatable responses, served whenever no plan step is queued.
    pages: Mutex<HashMap<String, String>>,
    /// One-shot scripted steps, consumed in order per URL.
    plans: Mutex<HashMap<String, VecDeque<FetchPlan>>>,
    connected: AtomicBool,
    recreate_calls: AtomicUsize,
}

/// Scripted [`Navigator`]. Clones share state, so tests can keep a handle
/// for assertions after moving a clone into the runner.
#[derive(Clone)]
pub struct ScriptedNavigator(Arc<NavigatorState>);

impl ScriptedNavigator {
    pub fn new() -> Self {
        let state = NavigatorState::default();
        state.connected.store(true, Ordering::SeqCst);
        Self(Arc::new(state))
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.0
            .pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_plan(self, url: &str, steps: Vec<FetchPlan>) -> Self {
        self.0
            .plans
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    pub fn recreate_calls(&self) -> usize {
        self.0.recreate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Navigator for ScriptedNavigator {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, IngestError> {
        if !self.0.connected.load(Ordering::SeqCst) {
            return Err(IngestError::ConnectivityLost("scripted".to_string()));
        }

        let step = self
            .0
            .plans
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|steps| steps.pop_front());

        match step {
            Some(FetchPlan::Page(html)) => Ok(html),
            Some(FetchPlan::Timeout) => Err(IngestError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
            Some(FetchPlan::Disconnect) => {
                self.0.connected.store(false, Ordering::SeqCst);
                Err(IngestError::ConnectivityLost(
                    "scripted disconnect".to_string(),
                ))
            }
            None => match self.0.pages.lock().unwrap().get(url) {
                Some(html) => Ok(html.clone()),
                None => Err(IngestError::NavigationFailed {
                    url: url.to_string(),
                    reason: "no scripted response".to_string(),
                }),
            },
        }
    }

    fn is_connected(&self) -> bool {
        self.0.connected.load(Ordering::SeqCst)
    }

    async fn recreate(&mut self) -> Result<(), IngestError> {
        self.0.recreate_calls.fetch_add(1, Ordering::SeqCst);
        self.0.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.0.connected.store(false, Ordering::SeqCst);
    }
}

/// In-memory [`PerspectiveWriter`] applying the Postgres conflict policy:
/// url-keyed rows, last write wins on mutable columns, first-insert id kept.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<String, Perspective>>>,
    fail_every_upsert: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upsert fail, for persistence-failure tests.
    pub fn fail_upserts(&self) {
        self.fail_every_upsert.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, url: &str) -> Option<Perspective> {
        self.rows.lock().unwrap().get(url).cloned()
    }

    pub fn urls(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl PerspectiveWriter for MemoryStore {
    async fn upsert(&self, record: &Perspective) -> Result<(), IngestError> {
        if self.fail_every_upsert.load(Ordering::SeqCst) {
            return Err(IngestError::PersistenceFailure(sqlx::Error::PoolClosed));
        }

        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&record.url) {
            Some(existing) => {
                existing.title = record.title.clone();
                existing.source = record.source.clone();
                existing.community = record.community;
                existing.quote = record.quote.clone();
                existing.sentiment = record.sentiment;
                existing.scraped_at = record.scraped_at;
            }
            None => {
                rows.insert(record.url.clone(), record.clone());
            }
        }
        Ok(())
    }
}

/// Summarizer that always fails with a degraded-enrichment error.
pub struct FailingSummarizer;

#[async_trait]
impl Summarize for FailingSummarizer {
    async fn summarize(&self, _text: &str, _max_sentences: usize) -> Result<String, IngestError> {
        Err(IngestError::EnrichmentDegraded {
            stage: "summarization",
            reason: "scripted failure".to_string(),
        })
    }
}

/// Summarizer that always returns the same canned summary.
pub struct CannedSummarizer(pub String);

#[async_trait]
impl Summarize for CannedSummarizer {
    async fn summarize(&self, _text: &str, _max_sentences: usize) -> Result<String, IngestError> {
        Ok(self.0.clone())
    }
}
