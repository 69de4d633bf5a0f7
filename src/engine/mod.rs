//! Automation engine adapter.
//!
//! The session and dispatch layers depend on the capability surface defined
//! here, never on a concrete engine. The default implementation drives
//! Chromium over CDP (see [`chromium`], behind the `chromium` feature);
//! tests substitute scripted implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ActionError, Result};

#[cfg(feature = "chromium")]
pub mod chromium;

/// Fixed user agent applied to every session page.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0";

/// Launch configuration for one browser process.
///
/// `hardened()` carries the fixed flag set every session uses: sandboxing off,
/// TLS certificate errors ignored, direct connection with the proxy bypassed.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub args: Vec<String>,
}

impl LaunchOptions {
    pub fn hardened() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
                "--ignore-certificate-errors".to_string(),
                "--proxy-server='direct://'".to_string(),
                "--proxy-bypass-list=*".to_string(),
            ],
        }
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::hardened()
    }
}

/// Options for rendering the current page to a PDF document.
/// Lengths are in inches, the engine's native unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfRenderOptions {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub print_background: bool,
    pub landscape: bool,
}

/// Handle to a running browser process/connection.
#[async_trait]
pub trait Browser: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Lightweight no-op request used as the liveness heartbeat probe.
    async fn version(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

/// Handle to one page within a browser session.
#[async_trait]
pub trait Page: Send + Sync {
    fn is_attached(&self) -> bool;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Replaces the page document and waits for it to load.
    async fn set_content(&self, html: &str) -> Result<()>;

    /// Evaluates a JavaScript expression, returning its JSON value.
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    async fn render_pdf(&self, options: &PdfRenderOptions) -> Result<Vec<u8>>;

    /// Captures a screenshot encoded as base64 PNG.
    async fn screenshot_base64(&self) -> Result<String>;

    /// Full DOM serialization of the current document.
    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;
}

/// Factory for browser sessions. One launch per action invocation.
#[async_trait]
pub trait AutomationEngine: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<(Arc<dyn Browser>, Arc<dyn Page>)>;
}

/// Polls `expression` until it evaluates to `true` or the timeout elapses.
///
/// Timeout errors carry a `TimeoutError` message so they classify as
/// transient downstream.
pub async fn wait_for_function(
    page: &dyn Page,
    expression: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if page.evaluate(expression).await?.as_bool() == Some(true) {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(ActionError::automation(format!(
                "TimeoutError: waiting for function `{}` failed after {:?}",
                expression, timeout
            )));
        }
        tokio::time::sleep(poll).await;
    }
}
