//! Crash-reporting sink client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::DEFAULT_CRASH_ENDPOINT;
use crate::{ActionError, Result};

/// Diagnostic snapshot submitted on failure. Transient: sent and discarded.
#[derive(Debug, Clone, Serialize)]
pub struct CrashReport {
    pub url: String,
    pub screenshot: String,
    pub html: String,
    pub metadata: Value,
    pub message: String,
    pub stack: String,
}

#[async_trait]
pub trait CrashSink: Send + Sync {
    async fn submit(&self, report: &CrashReport) -> Result<()>;
}

/// HTTP crash sink with bearer authentication.
#[derive(Debug)]
pub struct CrashClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CrashClient {
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_endpoint(access_token, DEFAULT_CRASH_ENDPOINT)
    }

    pub fn with_endpoint(access_token: &str, endpoint: impl Into<String>) -> Result<Self> {
        if access_token.is_empty() {
            return Err(ActionError::config(
                "Missing crash-reporting access token".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", access_token)).map_err(|_| {
                ActionError::config("Crash-reporting access token contains invalid characters")
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .no_proxy()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl CrashSink for CrashClient {
    async fn submit(&self, report: &CrashReport) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Sink used when no crash-reporting token is configured; drops reports.
#[derive(Debug, Default)]
pub struct NullCrashSink;

#[async_trait]
impl CrashSink for NullCrashSink {
    async fn submit(&self, report: &CrashReport) -> Result<()> {
        warn!(url = %report.url, "crash reporting disabled; dropping diagnostic snapshot");
        Ok(())
    }
}
