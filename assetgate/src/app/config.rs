//! Application configuration for [`AssetGate`](super::AssetGate).
//!
//! `AppConfig` combines everything needed to wire the application. It is
//! normally built from the INI [`ConfigFile`] so the translation from file
//! settings to component settings lives in one place.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::config::ConfigFile;
use crate::tile::GatewayConfig;

/// Where local tiles are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalTilesConfig {
    /// Root directory of the `{z}/{x}/{y}.{ext}` tree. `None` keeps tiles in
    /// memory only.
    pub directory: Option<PathBuf>,

    /// Tile file extension, without the dot.
    pub extension: String,
}

impl Default for LocalTilesConfig {
    fn default() -> Self {
        Self {
            directory: None,
            extension: "pbf".to_string(),
        }
    }
}

/// Application configuration combining all component configs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Bounds for both asset-type cache namespaces.
    pub cache: CacheConfig,

    /// Local tile source.
    pub tiles: LocalTilesConfig,

    /// Upstream and streaming settings.
    pub gateway: GatewayConfig,

    /// JSON file of asset-type records loaded into the store at startup.
    pub seed_file: Option<PathBuf>,
}

impl AppConfig {
    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let ttl = (config.cache.ttl_secs > 0).then(|| Duration::from_secs(config.cache.ttl_secs));

        Self {
            cache: CacheConfig::default()
                .with_max_entries(config.cache.max_entries)
                .with_time_to_live(ttl),
            tiles: LocalTilesConfig {
                directory: config.tiles.directory.clone(),
                extension: config.tiles.extension.clone(),
            },
            gateway: GatewayConfig {
                upstream_url: config.tiles.upstream_url.clone(),
                timeout: Duration::from_secs(config.tiles.timeout_secs),
                chunk_size: config.tiles.chunk_size,
                pipe_capacity: config.tiles.pipe_capacity,
            },
            seed_file: config.store.seed_file.clone(),
        }
    }

    /// Set the upstream URL template.
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.gateway = self.gateway.with_upstream_url(url);
        self
    }

    /// Set the upstream timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.gateway = self.gateway.with_timeout(timeout);
        self
    }

    /// Read local tiles from `directory`.
    pub fn with_tile_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.tiles.directory = Some(directory.into());
        self
    }

    /// Seed the asset-type store from `path`.
    pub fn with_seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    /// Set the cache bounds.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
