//! Application wiring.
//!
//! [`AssetGate`] builds the stores, the asset-type cache, the descriptor
//! projector and the tile gateway from one [`AppConfig`], and exposes the
//! consumer-facing operations.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        AssetGate                          │
//! │                                                           │
//! │  AssetTypeStore ──► AssetTypeCache ──► DescriptorProjector│
//! │                                                           │
//! │  TileStore ───────► TileGateway ◄──── UpstreamClient      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use assetgate::app::{AppConfig, AssetGate};
//! use assetgate::config::ConfigFile;
//!
//! let config = AppConfig::from_config_file(&ConfigFile::load()?);
//! let gate = AssetGate::start(config)?;
//!
//! let types = gate.get_all_asset_types().await?;
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::AssetGate;
pub use config::{AppConfig, LocalTilesConfig};
pub use error::AppError;
