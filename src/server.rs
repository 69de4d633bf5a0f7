//! HTTP front end.
//!
//! Thin transport adapter translating raw HTTP into [`ActionRequest`]s and
//! writing dispatcher envelopes back out. All routing, authentication, and
//! method checks live in the dispatcher, so a single fallback handler covers
//! every path.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Router;
use tracing::info;

use crate::dispatch::{ActionRequest, ActionResponse, Dispatcher, ResponseBody};
use crate::{ActionError, Result};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().fallback(handle).with_state(dispatcher)
}

/// Binds and serves until the process is stopped.
pub async fn serve(dispatcher: Arc<Dispatcher>, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server listening on http://localhost:{}", port);
    axum::serve(listener, router(dispatcher))
        .await
        .map_err(ActionError::Io)?;
    Ok(())
}

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(_) => None,
        Err(_) => None,
    };

    let action_request = ActionRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        authorization,
        body,
    };

    into_http(dispatcher.dispatch(&action_request).await)
}

fn into_http(response: ActionResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, response.content_type.as_str());

    let built = match response.body {
        ResponseBody::Json(value) => builder.body(Body::from(value.to_string())),
        ResponseBody::Binary(bytes) => builder.body(Body::from(bytes)),
    };

    built.unwrap_or_else(|_| {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::empty())
            .expect("empty response")
    })
}
