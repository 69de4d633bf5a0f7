//! Action handlers.
//!
//! Each handler is a pure function of (parameters, page handle) to a typed
//! outcome. Handlers never close the session and never swallow errors; the
//! failure capture protocol needs to see them.

use bytes::Bytes;
use serde_json::Value;

use crate::config::Timeouts;
use crate::engine::Page;
use crate::Result;

pub mod pdf_from_html;
pub mod scrape_pptr_docs;

/// Closed set of dispatchable actions, resolved at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ScrapePptrDocs,
    PdfFromHtml,
}

impl ActionKind {
    /// Resolves a logical action name from a `/v1/run` body.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scrape-pptr-docs" => Some(ActionKind::ScrapePptrDocs),
            _ => None,
        }
    }

    /// Resolves a dedicated route path.
    pub fn from_route(path: &str) -> Option<Self> {
        match path {
            "/v1/pdf/html" => Some(ActionKind::PdfFromHtml),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::ScrapePptrDocs => "scrape-pptr-docs",
            ActionKind::PdfFromHtml => "pdf-from-html",
        }
    }
}

/// Result of one action: structured data or a rendered document.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Json(Value),
    Pdf(Bytes),
}

/// Invokes the handler for `kind` with the session's page handle.
pub async fn run_action(
    kind: ActionKind,
    params: &Value,
    page: &dyn Page,
    timeouts: &Timeouts,
) -> Result<ActionOutcome> {
    match kind {
        ActionKind::ScrapePptrDocs => scrape_pptr_docs::run(page, timeouts).await,
        ActionKind::PdfFromHtml => pdf_from_html::run(params, page, timeouts).await,
    }
}
