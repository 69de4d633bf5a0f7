//! Failure capture protocol.
//!
//! Converts any error raised while exercising an action into a diagnosed,
//! user-presentable error, while guaranteeing session cleanup. Diagnostic
//! capture is strictly best-effort: a broken page or disconnected browser is
//! the most likely failure mode, and capture must never throw an error that
//! masks the root cause or leaks the session.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::crash::{CrashReport, CrashSink};
use crate::error::{
    default_transient_signatures, matches_transient_signature, ENGINE_ERROR_PAGE_URL,
    STABLE_TRANSIENT_MESSAGE,
};
use crate::session::Session;
use crate::{ActionError, Result};

/// Placeholder recorded when page state cannot be read.
pub const NOT_AVAILABLE: &str = "Not available";

pub struct FailureCapture {
    sink: Arc<dyn CrashSink>,
    transient_signatures: Vec<String>,
}

impl FailureCapture {
    pub fn new(sink: Arc<dyn CrashSink>) -> Self {
        Self {
            sink,
            transient_signatures: default_transient_signatures(),
        }
    }

    /// Overrides the transient-failure signature set.
    pub fn with_signatures(mut self, signatures: Vec<String>) -> Self {
        self.transient_signatures = signatures;
        self
    }

    /// Runs the full protocol for a failed invocation:
    ///
    /// 1. Best-effort diagnostic snapshot (skipped when the page is detached
    ///    or the connection is gone).
    /// 2. Snapshot submission to the crash sink.
    /// 3. Unconditional, idempotent session close.
    /// 4. Transient-failure classification and message rewrite.
    ///
    /// Secondary failures in steps 1-2 are logged and swallowed; the
    /// returned error is always derived from the triggering one.
    pub async fn capture(&self, error: ActionError, session: &Session) -> ActionError {
        let mut url = NOT_AVAILABLE.to_string();

        if !session.is_closed()
            && session.browser().is_connected()
            && session.page().is_attached()
        {
            match self.snapshot(session, &error).await {
                Ok(report) => {
                    url = report.url.clone();
                    if let Err(err) = self.sink.submit(&report).await {
                        warn!(error = %err, "failed to submit crash report");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to capture diagnostics");
                }
            }
        }

        session.close().await;

        self.classify(error, &url)
    }

    async fn snapshot(&self, session: &Session, error: &ActionError) -> Result<CrashReport> {
        let page = session.page();
        let screenshot = page.screenshot_base64().await?;
        let html = page.content().await?;
        let url = page.current_url().await?;

        Ok(CrashReport {
            url,
            screenshot,
            html,
            metadata: json!({}),
            message: error.to_string(),
            stack: error.stack().unwrap_or_default(),
        })
    }

    /// Rewrites known transient failures to the stable user-facing message;
    /// any other error keeps its original message verbatim.
    fn classify(&self, error: ActionError, url: &str) -> ActionError {
        let message = error.to_string();
        if url == ENGINE_ERROR_PAGE_URL
            || matches_transient_signature(&message, &self.transient_signatures)
        {
            ActionError::Automation {
                message: STABLE_TRANSIENT_MESSAGE.to_string(),
                stack: error.stack(),
            }
        } else {
            error
        }
    }
}
