//! Tile gateway: local tiles first, upstream passthrough second.
//!
//! # Request flow
//!
//! ```text
//! start ──► local lookup ──► served-local
//!                │
//!                └─(miss)──► remote fetch ──► served-remote
//!                                 │
//!                                 └──────────► upstream-error
//! ```
//!
//! # Passthrough policy
//!
//! The upstream status code, `content-type` and `content-encoding` are
//! relayed unchanged. The body is never decompressed; a gzip body is relayed
//! as gzip together with its `content-encoding: gzip` header and the consumer
//! decodes it. Inbound request headers are forwarded verbatim except for
//! connection-scoped headers the HTTP client manages itself.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::coord::{CoordError, TileCoordinate};
use super::pipe::{bounded_pipe, DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY};
use super::store::TileStore;
use super::upstream::{
    BodyStream, ReqwestUpstreamClient, UpstreamClient, UpstreamError, UpstreamSource,
};

/// Default upstream timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Request headers that are not forwarded upstream.
const CONNECTION_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

/// Errors returned by the tile gateway.
///
/// None of these carry transport detail; that is logged, not returned.
#[derive(Debug, Error)]
pub enum TileError {
    /// The tile address is malformed. Rejected before any I/O.
    #[error("Invalid tile coordinate: {0}")]
    InvalidCoordinate(#[from] CoordError),

    /// No upstream is configured, or it cannot address this tile.
    #[error("No remote tile source configured")]
    NoRemoteSource,

    /// The upstream failed or timed out.
    #[error("Tile unavailable")]
    Unavailable,

    /// Writing the body to the consumer failed.
    #[error("Failed to write tile: {0}")]
    Downstream(#[source] io::Error),
}

/// Configuration for the tile gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Upstream URL template; `None` disables remote fetches.
    pub upstream_url: Option<String>,

    /// Bound on the whole upstream fetch.
    pub timeout: Duration,

    /// Maximum size of each relayed body chunk.
    pub chunk_size: usize,

    /// Number of chunks buffered between upstream and consumer.
    pub pipe_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Set the upstream URL template.
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = Some(url.into());
        self
    }

    /// Set the upstream timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the relayed chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the pipe capacity in chunks.
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity;
        self
    }
}

/// Result of a local-only tile lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    /// The tile is stored locally.
    Local(Bytes),
    /// No local tile; a normal, silent outcome.
    NoContent,
}

/// Result of the full local-then-remote resolution.
#[derive(Debug)]
pub enum TileResponse {
    /// Served from the local store.
    Local(Bytes),
    /// Relayed from the upstream.
    Remote(ProxiedResponse),
    /// No local tile and no upstream configured.
    NoContent,
}

/// An upstream response relayed to the consumer.
///
/// Lives for one request; never cached.
pub struct ProxiedResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    content_encoding: Option<HeaderValue>,
    body: BodyStream,
}

impl ProxiedResponse {
    /// Upstream status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Upstream `content-type`, if sent.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    /// Upstream `content-encoding`, if sent. Describes the body as relayed.
    pub fn content_encoding(&self) -> Option<&HeaderValue> {
        self.content_encoding.as_ref()
    }

    /// Take the body stream.
    pub fn into_body(self) -> BodyStream {
        self.body
    }

    /// Stream the body into `writer`, returning the number of bytes written.
    pub async fn copy_to<W>(self, writer: &mut W) -> Result<u64, TileError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut body = self.body;
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(body_failed)?;
            writer
                .write_all(&chunk)
                .await
                .map_err(TileError::Downstream)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(TileError::Downstream)?;

        Ok(written)
    }

    /// Collect the whole body into memory.
    pub async fn into_bytes(self) -> Result<Bytes, TileError> {
        let mut body = self.body;
        let mut buffer = BytesMut::new();

        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk.map_err(body_failed)?);
        }

        Ok(buffer.freeze())
    }
}

impl fmt::Debug for ProxiedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxiedResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_encoding", &self.content_encoding)
            .finish_non_exhaustive()
    }
}

fn body_failed(e: io::Error) -> TileError {
    warn!(error = %e, "Upstream tile body failed mid-stream");
    TileError::Unavailable
}

/// Serves local tiles and relays missing ones from the upstream.
pub struct TileGateway {
    store: Arc<dyn TileStore>,
    upstream: Option<UpstreamSource>,
    client: Arc<dyn UpstreamClient>,
    config: GatewayConfig,
}

impl TileGateway {
    /// Create a gateway using a reqwest client bounded by `config.timeout`.
    pub fn new(store: Arc<dyn TileStore>, config: GatewayConfig) -> Result<Self, UpstreamError> {
        let client = Arc::new(ReqwestUpstreamClient::new(config.timeout)?);
        Ok(Self::with_client(store, client, config))
    }

    /// Create a gateway with a custom upstream client.
    pub fn with_client(
        store: Arc<dyn TileStore>,
        client: Arc<dyn UpstreamClient>,
        config: GatewayConfig,
    ) -> Self {
        let upstream = config
            .upstream_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(UpstreamSource::new);

        match &upstream {
            Some(source) => info!(upstream = source.template(), "Tile gateway using upstream"),
            None => info!("Tile gateway has no upstream, serving local tiles only"),
        }

        Self {
            store,
            upstream,
            client,
            config,
        }
    }

    /// Whether an upstream is configured.
    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    /// Serve a tile from the local store only.
    pub async fn get_tile(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
    ) -> Result<TileOutcome, TileError> {
        let coord = TileCoordinate::new(zoom, column, row)?;

        Ok(match self.lookup_local(coord).await {
            Some(data) => TileOutcome::Local(data),
            None => TileOutcome::NoContent,
        })
    }

    /// Relay a tile from the upstream, forwarding `headers`.
    ///
    /// # Errors
    ///
    /// - [`TileError::NoRemoteSource`] if no usable upstream is configured
    /// - [`TileError::Unavailable`] if the upstream fails or times out
    pub async fn get_external_tile(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
        headers: &HeaderMap,
    ) -> Result<ProxiedResponse, TileError> {
        let coord = TileCoordinate::new(zoom, column, row)?;
        let source = self.upstream.as_ref().ok_or(TileError::NoRemoteSource)?;
        self.fetch_remote(source, coord, headers).await
    }

    /// Resolve a tile: local store first, then the upstream.
    pub async fn resolve(
        &self,
        zoom: u32,
        column: u32,
        row: u32,
        headers: &HeaderMap,
    ) -> Result<TileResponse, TileError> {
        let coord = TileCoordinate::new(zoom, column, row)?;

        if let Some(data) = self.lookup_local(coord).await {
            return Ok(TileResponse::Local(data));
        }

        match &self.upstream {
            Some(source) => self
                .fetch_remote(source, coord, headers)
                .await
                .map(TileResponse::Remote),
            None => {
                debug!(tile = %coord, "No local tile and no upstream");
                Ok(TileResponse::NoContent)
            }
        }
    }

    /// Local lookup. Store errors are logged and treated as a miss.
    async fn lookup_local(&self, coord: TileCoordinate) -> Option<Bytes> {
        match self.store.lookup(coord).await {
            Ok(Some(data)) => {
                debug!(tile = %coord, bytes = data.len(), "Serving local tile");
                Some(data)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(tile = %coord, error = %e, "Local tile lookup failed");
                None
            }
        }
    }

    async fn fetch_remote(
        &self,
        source: &UpstreamSource,
        coord: TileCoordinate,
        inbound: &HeaderMap,
    ) -> Result<ProxiedResponse, TileError> {
        let url = source.url_for(coord).map_err(|e| {
            warn!(tile = %coord, error = %e, "Tile has no upstream location");
            TileError::NoRemoteSource
        })?;

        let fetch = self.client.fetch(url.clone(), forwardable_headers(inbound));
        let response = match tokio::time::timeout(self.config.timeout, fetch).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(tile = %coord, url = %url, error = %e, "Upstream tile fetch failed");
                return Err(TileError::Unavailable);
            }
            Err(_) => {
                warn!(
                    tile = %coord,
                    url = %url,
                    timeout = ?self.config.timeout,
                    "Upstream tile fetch timed out"
                );
                return Err(TileError::Unavailable);
            }
        };

        info!(tile = %coord, status = response.status.as_u16(), "Relaying upstream tile");

        Ok(ProxiedResponse {
            status: response.status,
            content_type: response.headers.get(header::CONTENT_TYPE).cloned(),
            content_encoding: response.headers.get(header::CONTENT_ENCODING).cloned(),
            body: bounded_pipe(response.body, self.config.chunk_size, self.config.pipe_capacity),
        })
    }
}

/// Copy inbound request headers, minus connection-scoped ones.
fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !CONNECTION_HEADERS.contains(&name.as_str()) {
            outbound.append(name.clone(), value.clone());
        }
    }
    outbound
}
