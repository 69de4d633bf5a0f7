//! Browser Actions
//!
//! A small set of browser-driven actions (documentation scraping, HTML-to-PDF
//! rendering) behind an authenticated action dispatcher. Each action runs in
//! an ephemeral headless-browser session; failures produce a diagnostic
//! snapshot for an external crash-reporting sink and a normalized error
//! envelope.
//!
//! # Module Overview
//!
//! - [`engine`] - Automation engine adapter (traits + Chromium implementation)
//! - [`session`] - Browser session lifecycle: open, heartbeat, exactly-once close
//! - [`capture`] - Failure capture protocol: diagnostics, reporting, normalization
//! - [`dispatch`] - Request validation, action resolution, response envelopes
//! - [`actions`] - The action handlers themselves
//! - [`crash`] - Crash-reporting sink client
//! - [`storage`] - Optional object-storage sink for rendered documents
//! - [`config`] - Environment + TOML configuration
//! - [`server`] - HTTP transport adapter
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use browser_actions::{Dispatcher, ServiceConfig};
//! use browser_actions::crash::NullCrashSink;
//! use browser_actions::dispatch::ActionRequest;
//!
//! # #[cfg(feature = "chromium")]
//! # async fn example() {
//! let config = ServiceConfig::from_env();
//! let dispatcher = Dispatcher::new(
//!     config,
//!     Arc::new(browser_actions::engine::chromium::ChromiumEngine::new()),
//!     Arc::new(NullCrashSink),
//!     None,
//! );
//!
//! let response = dispatcher
//!     .dispatch(&ActionRequest {
//!         method: "POST".to_string(),
//!         path: "/v1/run".to_string(),
//!         authorization: Some("Bearer secret".to_string()),
//!         body: Some(r#"{"action":"scrape-pptr-docs"}"#.to_string()),
//!     })
//!     .await;
//! # }
//! ```

pub mod actions;
pub mod capture;
pub mod config;
pub mod crash;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod server;
pub mod session;
pub mod storage;

pub use capture::FailureCapture;
pub use config::{ServiceConfig, StorageConfig, Timeouts};
pub use dispatch::{ActionRequest, ActionResponse, Dispatcher, ResponseBody};
pub use error::{
    ActionError, ErrorEnvelope, Result, DEFAULT_TRANSIENT_SIGNATURES, ENGINE_ERROR_PAGE_URL,
    STABLE_TRANSIENT_MESSAGE,
};
pub use session::{Session, SessionManager, SessionOptions};
