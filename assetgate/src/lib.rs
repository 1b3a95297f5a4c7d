//! AssetGate - asset-type metadata cache and map tile gateway
//!
//! This library provides two services for an asset-management backend:
//!
//! - [`asset`]: a read-through cache over custom asset-type records with
//!   single-flight population and delete-driven invalidation, plus the
//!   projection of those records into asset descriptors.
//! - [`tile`]: a gateway that serves locally stored map tiles and otherwise
//!   streams the tile from a configured upstream source.
//!
//! The [`app::AssetGate`] facade wires both together behind the consumer-facing
//! API.

pub mod app;
pub mod asset;
pub mod cache;
pub mod config;
pub mod logging;
pub mod tile;

/// Crate version, used in log banners and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boxed future type for dyn-compatible async trait methods.
///
/// Collaborator traits ([`asset::AssetTypeStore`], [`tile::TileStore`],
/// [`tile::UpstreamClient`]) return this so they can be used as trait objects.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
