//! Upstream tile source and HTTP client abstraction.
//!
//! [`UpstreamSource`] maps a [`TileCoordinate`] to the upstream's URL scheme.
//! [`UpstreamClient`] performs the GET; the reqwest implementation is built
//! without automatic decompression, so the body and its `content-encoding`
//! header are always relayed together exactly as the upstream sent them.

use std::io;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use thiserror::Error;

use super::coord::TileCoordinate;
use crate::BoxFuture;

/// Body of an upstream response, yielded chunk by chunk.
pub type BodyStream = BoxStream<'static, Result<bytes::Bytes, io::Error>>;

/// Errors talking to the upstream tile source.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The template does not produce a valid URL for a coordinate.
    #[error("Invalid upstream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection or protocol failure.
    #[error("Upstream request failed: {0}")]
    Request(String),

    /// The request did not complete in time.
    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Configured upstream tile location.
///
/// The template may contain `{z}`, `{x}`, `{y}` and `{-y}` (TMS row)
/// placeholders. A template without placeholders is treated as a base URL and
/// `/{z}/{x}/{y}` is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSource {
    template: String,
}

impl UpstreamSource {
    /// Create a source from a URL template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The configured template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Resolve the upstream URL for `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidUrl`] if the expanded template is not
    /// an absolute `http` or `https` URL.
    pub fn url_for(&self, coord: TileCoordinate) -> Result<Url, UpstreamError> {
        let expanded = if self.template.contains('{') {
            self.template
                .replace("{z}", &coord.zoom().to_string())
                .replace("{x}", &coord.column().to_string())
                .replace("{-y}", &coord.tms_row().to_string())
                .replace("{y}", &coord.row().to_string())
        } else {
            format!("{}/{}", self.template.trim_end_matches('/'), coord)
        };

        let invalid = |reason: String| UpstreamError::InvalidUrl {
            url: expanded.clone(),
            reason,
        };

        let url = Url::parse(&expanded).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" if url.host().is_some() => Ok(url),
            "http" | "https" => Err(invalid("missing host".to_string())),
            scheme => Err(invalid(format!("unsupported scheme '{}'", scheme))),
        }
    }
}

/// Response head and streaming body from the upstream.
pub struct UpstreamResponse {
    /// Status code as sent by the upstream.
    pub status: StatusCode,
    /// Response headers as sent by the upstream.
    pub headers: HeaderMap,
    /// Response body, undecoded.
    pub body: BodyStream,
}

/// Trait for the outbound tile fetch.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock upstreams in tests.
pub trait UpstreamClient: Send + Sync {
    /// Perform a GET to `url` with the given request headers.
    ///
    /// Resolves once the response head has arrived; the body is streamed.
    fn fetch(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>>;
}

/// Upstream client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestUpstreamClient {
    /// Create a client whose requests, body included, are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl UpstreamClient for ReqwestUpstreamClient {
    fn fetch(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> BoxFuture<'_, Result<UpstreamResponse, UpstreamError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .headers(headers)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        UpstreamError::Timeout(self.timeout)
                    } else {
                        UpstreamError::Request(e.to_string())
                    }
                })?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes_stream().map_err(io::Error::other).boxed();

            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        })
    }
}
