//! Browser session lifecycle.
//!
//! A [`SessionManager`] produces one ready-to-use [`Session`] per action
//! invocation and guarantees leak-free, exactly-once teardown. Handlers only
//! ever see the page handle; closing stays with the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::{AutomationEngine, Browser, LaunchOptions, Page};
use crate::Result;

/// Default interval between liveness probes.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SessionOptions {
    pub launch: LaunchOptions,
    pub heartbeat_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            launch: LaunchOptions::hardened(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Opens sessions against a pluggable automation engine.
pub struct SessionManager {
    engine: Arc<dyn AutomationEngine>,
    options: SessionOptions,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn AutomationEngine>, options: SessionOptions) -> Self {
        Self { engine, options }
    }

    /// Launches the engine with the hardened configuration and starts the
    /// liveness heartbeat. Fails with `EngineLaunch` when the engine cannot
    /// start; nothing to tear down in that case.
    pub async fn open(&self) -> Result<Session> {
        let (browser, page) = self.engine.launch(&self.options.launch).await?;

        let heartbeat = CancellationToken::new();
        tokio::spawn(heartbeat_loop(
            Arc::clone(&browser),
            Arc::clone(&page),
            heartbeat.clone(),
            self.options.heartbeat_interval,
        ));

        debug!("browser session opened");
        Ok(Session {
            browser,
            page,
            heartbeat,
            closed: AtomicBool::new(false),
        })
    }
}

/// One live browser-automation context, exclusive to a single invocation.
pub struct Session {
    browser: Arc<dyn Browser>,
    page: Arc<dyn Page>,
    heartbeat: CancellationToken,
    closed: AtomicBool,
}

impl Session {
    /// Borrowed page handle for the action handler. Handlers never close it.
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent teardown. The first call cancels the heartbeat and closes
    /// the engine connection; later calls are no-ops. Close failures are
    /// swallowed because close runs inside failure paths where a further
    /// error would mask the original one.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.heartbeat.cancel();

        if self.browser.is_connected() {
            if let Err(err) = self.browser.close().await {
                warn!(error = %err, "failed to close browser session");
            }
        }
        debug!("browser session closed");
    }
}

/// Periodic no-op probe keeping the engine's control channel alive.
///
/// Stops on cancellation, on a lost connection or detached page, and on the
/// first failed probe. Probe failures are swallowed; the session's own error
/// path reports the real problem.
async fn heartbeat_loop(
    browser: Arc<dyn Browser>,
    page: Arc<dyn Page>,
    token: CancellationToken,
    interval: Duration,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                if !browser.is_connected() || !page.is_attached() {
                    break;
                }
                if let Err(err) = browser.version().await {
                    debug!(error = %err, "heartbeat probe failed; stopping");
                    break;
                }
            }
        }
    }
}
