//! Dataset sources.
//!
//! The ingestor reads the whole source table in one request. `HttpSource`
//! is the production implementation; `StaticSource` serves fixed bytes for
//! tests and local runs.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{IngestError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Where the raw table comes from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches the full source content.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::SourceFetch` if the content cannot be retrieved.
    async fn fetch(&self) -> Result<Bytes>;

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}

/// Fetches the table with a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a source for `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Config` if the URL is not http(s) or the client
    /// cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let parsed = reqwest::Url::parse(&url).map_err(|e| IngestError::Config {
            message: format!("invalid source URL '{url}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestError::Config {
                message: format!("source URL must be http or https (got {url})"),
            });
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| IngestError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    /// Returns the source URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DatasetSource for HttpSource {
    async fn fetch(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "timed out" } else { "failed" };
                IngestError::source_fetch_with(format!("GET {} {reason}", self.url), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(IngestError::source_fetch(format!(
                "GET {} returned {status}: {body}",
                self.url
            )));
        }

        response.bytes().await.map_err(|e| {
            IngestError::source_fetch_with(format!("reading body of {} failed", self.url), e)
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// In-memory source returning fixed content.
#[derive(Debug, Clone)]
pub struct StaticSource {
    content: Bytes,
}

impl StaticSource {
    /// Creates a source that always returns `content`.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for StaticSource {
    async fn fetch(&self) -> Result<Bytes> {
        Ok(self.content.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} bytes)", self.content.len())
    }
}
