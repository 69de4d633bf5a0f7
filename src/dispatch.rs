//! Action dispatcher.
//!
//! Turns one normalized inbound request into exactly one action invocation
//! with a uniform response contract. Validation failures are resolved here
//! without opening a session; handler and session-setup failures are routed
//! through the failure capture protocol exactly once.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::actions::{run_action, ActionKind, ActionOutcome};
use crate::capture::FailureCapture;
use crate::config::{ServiceConfig, ACCESS_TOKEN_MISSING, CRASH_TOKEN_MISSING};
use crate::crash::CrashSink;
use crate::engine::{AutomationEngine, LaunchOptions};
use crate::session::{SessionManager, SessionOptions};
use crate::storage::ObjectStorage;
use crate::{ActionError, Result};

/// Route accepting `{action, params}` bodies resolved by logical name.
pub const RUN_ROUTE: &str = "/v1/run";

/// Normalized inbound invocation, immutable after construction.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Binary(Bytes),
}

/// Uniform response envelope handed back to the transport adapter.
#[derive(Debug, Clone)]
pub struct ActionResponse {
    pub status: u16,
    pub content_type: String,
    pub body: ResponseBody,
}

impl ActionResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: ResponseBody::Json(body),
        }
    }

    pub fn binary(content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            body: ResponseBody::Binary(bytes),
        }
    }

    /// Whether the transport must base64-encode the body for text envelopes.
    pub fn is_base64_encoded(&self) -> bool {
        matches!(self.body, ResponseBody::Binary(_))
    }
}

pub struct Dispatcher {
    config: ServiceConfig,
    sessions: SessionManager,
    capture: FailureCapture,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl Dispatcher {
    pub fn new(
        config: ServiceConfig,
        engine: Arc<dyn AutomationEngine>,
        crash_sink: Arc<dyn CrashSink>,
        storage: Option<Arc<dyn ObjectStorage>>,
    ) -> Self {
        let mut launch = LaunchOptions::hardened();
        launch.executable = config.chromium_path.clone();

        let sessions = SessionManager::new(
            engine,
            SessionOptions {
                launch,
                heartbeat_interval: config.timeouts.heartbeat_interval,
            },
        );

        Self {
            capture: FailureCapture::new(crash_sink),
            sessions,
            storage,
            config,
        }
    }

    /// Processes one request end to end. Every path, success or failure,
    /// produces exactly one response.
    pub async fn dispatch(&self, request: &ActionRequest) -> ActionResponse {
        match self.validate(request) {
            Ok((kind, params)) => self.invoke(kind, params).await,
            Err(err) => self.error_response(err),
        }
    }

    /// Pre-session checks, in fixed order: operational config, bearer
    /// credential, method, route/action, body shape.
    fn validate(&self, request: &ActionRequest) -> Result<(ActionKind, Value)> {
        let access_token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| ActionError::config(ACCESS_TOKEN_MISSING))?;
        if self.config.crash_token.is_none() {
            return Err(ActionError::config(CRASH_TOKEN_MISSING));
        }

        let expected = format!("Bearer {}", access_token);
        if request.authorization.as_deref() != Some(expected.as_str()) {
            return Err(ActionError::Auth);
        }

        if !request.method.eq_ignore_ascii_case("POST") {
            return Err(ActionError::MethodNotAllowed);
        }

        if request.path == RUN_ROUTE {
            let body = parse_body(request.body.as_deref())?;
            let kind = body
                .get("action")
                .and_then(Value::as_str)
                .and_then(ActionKind::from_name)
                .ok_or(ActionError::InvalidAction)?;
            let params = body.get("params").cloned().unwrap_or_else(|| json!({}));
            return Ok((kind, params));
        }

        if let Some(kind) = ActionKind::from_route(&request.path) {
            let params = parse_body(request.body.as_deref())?;
            return Ok((kind, params));
        }

        Err(ActionError::NotFound)
    }

    /// Opens a session, runs the handler, and packages the outcome. Failures
    /// from the handler (and from result upload) go through capture; session
    /// launch failures have no session to diagnose and surface directly.
    async fn invoke(&self, kind: ActionKind, params: Value) -> ActionResponse {
        info!(action = kind.name(), "dispatching action");

        let session = match self.sessions.open().await {
            Ok(session) => session,
            Err(err) => {
                error!(action = kind.name(), error = %err, "session open failed");
                return self.error_response(err);
            }
        };

        let started = Instant::now();
        match run_action(kind, &params, session.page(), &self.config.timeouts).await {
            Ok(outcome) => {
                session.close().await;
                match self.package(outcome, started).await {
                    Ok(response) => {
                        info!(action = kind.name(), status = response.status, "action succeeded");
                        response
                    }
                    Err(err) => {
                        error!(action = kind.name(), error = %err, "result packaging failed");
                        let err = self.capture.capture(err, &session).await;
                        self.error_response(err)
                    }
                }
            }
            Err(err) => {
                error!(action = kind.name(), error = %err, "action failed");
                let err = self.capture.capture(err, &session).await;
                self.error_response(err)
            }
        }
    }

    async fn package(&self, outcome: ActionOutcome, started: Instant) -> Result<ActionResponse> {
        match outcome {
            ActionOutcome::Json(value) => Ok(ActionResponse::json(200, value)),
            ActionOutcome::Pdf(bytes) => match &self.storage {
                Some(storage) => {
                    let size = bytes.len();
                    let url = storage.upload_pdf(bytes).await?;
                    Ok(ActionResponse::json(
                        200,
                        json!({
                            "url": url,
                            "milliseconds_taken": started.elapsed().as_millis() as u64,
                            "bites_size": size,
                        }),
                    ))
                }
                None => Ok(ActionResponse::binary("application/pdf", bytes)),
            },
        }
    }

    fn error_response(&self, err: ActionError) -> ActionResponse {
        let envelope = err.to_envelope(self.config.verbose_errors);
        let body = serde_json::to_value(&envelope)
            .unwrap_or_else(|_| json!({ "message": envelope.message }));
        ActionResponse::json(err.status_code(), body)
    }
}

fn parse_body(raw: Option<&str>) -> Result<Value> {
    match raw {
        Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(text)?),
        _ => Ok(json!({})),
    }
}
