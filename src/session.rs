//! Browser session management.
//!
//! [`SessionManager`] owns the headless-Chromium lifecycle for one ingestion
//! run: `CLOSED -> ACTIVE` on [`SessionManager::open`], `ACTIVE ->
//! DISCONNECTED` when the CDP event stream ends underneath us, and back to
//! `ACTIVE` through [`Navigator::recreate`]. Callers never receive a page or
//! browser handle: [`Navigator::fetch_page`] opens a fresh page, navigates
//! with a timeout, returns the rendered HTML, and closes the page on every
//! exit path, so no caller can hold a stale session reference across a
//! rebuild.
//!
//! The [`Navigator`] trait is the seam the rest of the pipeline is generic
//! over; tests substitute a scripted implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::IngestError;

/// Desktop user agent presented to scraped sites.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Session-backed page fetching, with connectivity introspection and rebuild.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Load `url` in a fresh, isolated navigation context and return the
    /// rendered HTML. The context is released before this returns, success
    /// or failure.
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, IngestError>;

    /// Whether the underlying engine connection is still live.
    fn is_connected(&self) -> bool;

    /// Tear down any live resources and relaunch from the closed state.
    async fn recreate(&mut self) -> Result<(), IngestError>;

    /// Controlled shutdown. Safe to call from any state.
    async fn close(&mut self);
}

struct ActiveSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

/// Exclusive owner of the browser-automation engine for one run.
pub struct SessionManager {
    session: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Launch the automation engine and its event-handler task. Only valid
    /// from the closed state.
    #[instrument(level = "info", skip_all)]
    pub async fn open(&mut self) -> Result<(), IngestError> {
        if self.session.is_some() {
            return Err(IngestError::SessionUnavailable(
                "open() called on an active session".to_string(),
            ));
        }

        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(IngestError::SessionUnavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| IngestError::SessionUnavailable(e.to_string()))?;

        // The handler stream must be drained for the browser to make
        // progress; when it ends the connection is gone.
        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            flag.store(false, Ordering::SeqCst);
        });

        info!("Browser session initialized");
        self.session = Some(ActiveSession {
            browser,
            handler_task,
            connected,
        });
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.browser.close().await {
                debug!(error = %e, "Browser close reported an error");
            }
            if let Err(e) = session.browser.wait().await {
                debug!(error = %e, "Browser process wait reported an error");
            }
            session.handler_task.abort();
            info!("Browser session closed");
        }
    }

    fn classify_cdp_error(&self, url: &str, e: CdpError) -> IngestError {
        if !self.is_connected() {
            IngestError::ConnectivityLost(e.to_string())
        } else {
            IngestError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Navigator for SessionManager {
    #[instrument(level = "debug", skip(self, timeout))]
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<String, IngestError> {
        let session = self.session.as_ref().ok_or_else(|| {
            IngestError::SessionUnavailable("no active browser session".to_string())
        })?;
        if !session.connected.load(Ordering::SeqCst) {
            return Err(IngestError::ConnectivityLost(
                "browser event stream ended".to_string(),
            ));
        }

        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| self.classify_cdp_error(url, e))?;

        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            page.content().await
        };
        let result = tokio::time::timeout(timeout, navigation).await;

        // The page is released on every path, including timeouts.
        if let Err(e) = page.close().await {
            debug!(%url, error = %e, "Failed to close page");
        }

        match result {
            Err(_) => Err(IngestError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(self.classify_cdp_error(url, e)),
        }
    }

    fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.connected.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    #[instrument(level = "info", skip_all)]
    async fn recreate(&mut self) -> Result<(), IngestError> {
        warn!("Rebuilding browser session");
        self.teardown().await;
        self.open().await
    }

    async fn close(&mut self) {
        self.teardown().await;
    }
}
