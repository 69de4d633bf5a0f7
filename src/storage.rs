//! Object-storage sink for rendered documents.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::{ActionError, Result};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads a rendered PDF under a fresh key and returns its public URL.
    async fn upload_pdf(&self, pdf: Bytes) -> Result<String>;
}

/// Storage sink speaking plain authenticated HTTP PUT against an
/// S3-compatible endpoint. Objects land at `<endpoint>/<uuid>.pdf` and are
/// addressed publicly at `<public_base>/<uuid>.pdf`.
#[derive(Debug)]
pub struct HttpBucketStorage {
    client: reqwest::Client,
    endpoint: Url,
    public_base: Url,
}

impl HttpBucketStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = parse_base_url(&config.endpoint)?;
        let public_base = match &config.public_base_url {
            Some(base) => parse_base_url(base)?,
            None => endpoint.clone(),
        };

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.access_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    ActionError::config("Storage access token contains invalid characters")
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .no_proxy()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            public_base,
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpBucketStorage {
    async fn upload_pdf(&self, pdf: Bytes) -> Result<String> {
        let key = format!("{}.pdf", Uuid::now_v7());
        let target = self
            .endpoint
            .join(&key)
            .map_err(|e| ActionError::config(format!("Invalid storage endpoint: {}", e)))?;

        self.client
            .put(target)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(pdf)
            .send()
            .await?
            .error_for_status()?;

        let public = self
            .public_base
            .join(&key)
            .map_err(|e| ActionError::config(format!("Invalid storage public base URL: {}", e)))?;
        Ok(public.to_string())
    }
}

/// Parses a base URL, forcing a trailing slash so `Url::join` appends the
/// key instead of replacing the last path segment.
fn parse_base_url(value: &str) -> Result<Url> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{}/", value)
    };
    Url::parse(&normalized)
        .map_err(|e| ActionError::config(format!("Invalid storage URL '{}': {}", value, e)))
}
