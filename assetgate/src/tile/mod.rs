//! Map tile gateway.
//!
//! Tiles are served from a local [`TileStore`] when present. Otherwise the
//! [`TileGateway`] streams the tile from a configured upstream through a
//! bounded pipe, relaying status, content type and content encoding unchanged.

mod coord;
mod gateway;
mod pipe;
mod store;
mod upstream;

pub use coord::{tiles_per_side, CoordError, TileCoordinate, MAX_ZOOM};
pub use gateway::{
    GatewayConfig, ProxiedResponse, TileError, TileGateway, TileOutcome, TileResponse,
    DEFAULT_TIMEOUT_SECS,
};
pub use pipe::{bounded_pipe, DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY};
pub use store::{DirectoryTileStore, MemoryTileStore, TileStore, TileStoreError};
pub use upstream::{
    BodyStream, ReqwestUpstreamClient, UpstreamClient, UpstreamError, UpstreamResponse,
    UpstreamSource,
};

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::StatusCode;

#[cfg(test)]
pub(crate) use upstream::tests as upstream_mock;
