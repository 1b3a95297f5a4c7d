//! Application error types.

use thiserror::Error;

use crate::asset::StoreError;
use crate::config::ConfigError;
use crate::tile::UpstreamError;

/// Errors that can occur while starting the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The asset-type store could not be seeded.
    #[error("Failed to open asset type store: {0}")]
    Store(#[from] StoreError),

    /// The upstream HTTP client could not be built.
    #[error("Failed to create tile gateway: {0}")]
    Gateway(#[from] UpstreamError),
}
