use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable user-facing message substituted for known transient automation failures.
pub const STABLE_TRANSIENT_MESSAGE: &str =
    "An unexpected error occurred. Wait a moment and try again.";

/// Navigation URL the engine lands on when it could not render the requested page.
pub const ENGINE_ERROR_PAGE_URL: &str = "chrome-error://chromewebdata/";

/// Message substrings identifying transient automation failures.
///
/// An error whose message contains any of these is retry-worthy from the
/// caller's point of view and gets rewritten to [`STABLE_TRANSIENT_MESSAGE`].
pub const DEFAULT_TRANSIENT_SIGNATURES: &[&str] = &[
    "Navigation timeout",
    "ERR_CONNECTION_RESET",
    "Protocol error",
    "Waiting for selector",
    "Execution context was destroyed",
    "timed out",
    "Timed out",
    "TimeoutError",
    "Waiting failed",
];

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Config(String),

    #[error("Unauthorized")]
    Auth,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Not Found")]
    NotFound,

    #[error("Invalid action")]
    InvalidAction,

    #[error("Failed to launch browser engine: {0}")]
    EngineLaunch(String),

    #[error("{message}")]
    Automation {
        message: String,
        stack: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    pub fn automation(message: impl Into<String>) -> Self {
        ActionError::Automation {
            message: message.into(),
            stack: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ActionError::Config(message.into())
    }

    /// HTTP status the dispatcher surfaces this error as.
    pub fn status_code(&self) -> u16 {
        match self {
            ActionError::Auth => 401,
            ActionError::MethodNotAllowed => 405,
            ActionError::NotFound => 404,
            ActionError::InvalidAction => 400,
            _ => 500,
        }
    }

    /// Failure detail beyond the message, when the error carries any.
    ///
    /// For automation errors this is the upstream stack if one was recorded;
    /// for wrapped errors it is the rendered cause chain.
    pub fn stack(&self) -> Option<String> {
        match self {
            ActionError::Automation { stack, .. } => stack.clone(),
            ActionError::Network(e) => render_cause_chain(e),
            ActionError::Serialization(e) => render_cause_chain(e),
            ActionError::Io(e) => render_cause_chain(e),
            _ => None,
        }
    }

    pub fn to_envelope(&self, include_stack: bool) -> ErrorEnvelope {
        ErrorEnvelope {
            message: self.to_string(),
            stack: if include_stack { self.stack() } else { None },
        }
    }
}

fn render_cause_chain(err: &dyn std::error::Error) -> Option<String> {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Checks a message against a transient-signature set.
pub fn matches_transient_signature(message: &str, signatures: &[String]) -> bool {
    signatures.iter().any(|sig| message.contains(sig.as_str()))
}

/// Default transient signatures as owned strings, for use as a configurable set.
pub fn default_transient_signatures() -> Vec<String> {
    DEFAULT_TRANSIENT_SIGNATURES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// JSON body of a failed invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

pub type Result<T> = std::result::Result<T, ActionError>;
