//! Addressable configuration settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigError, ConfigFile};
use crate::tile::{TileCoordinate, UpstreamSource};

/// Every setting in the configuration file, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    CacheMaxEntries,
    CacheTtlSecs,
    TilesDirectory,
    TilesExtension,
    TilesUpstreamUrl,
    TilesTimeoutSecs,
    TilesChunkSize,
    TilesPipeCapacity,
    StoreSeedFile,
    LoggingLevel,
    LoggingFile,
}

const ALL_KEYS: &[ConfigKey] = &[
    ConfigKey::CacheMaxEntries,
    ConfigKey::CacheTtlSecs,
    ConfigKey::TilesDirectory,
    ConfigKey::TilesExtension,
    ConfigKey::TilesUpstreamUrl,
    ConfigKey::TilesTimeoutSecs,
    ConfigKey::TilesChunkSize,
    ConfigKey::TilesPipeCapacity,
    ConfigKey::StoreSeedFile,
    ConfigKey::LoggingLevel,
    ConfigKey::LoggingFile,
];

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        ALL_KEYS
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        match self {
            Self::CacheMaxEntries | Self::CacheTtlSecs => "cache",
            Self::TilesDirectory
            | Self::TilesExtension
            | Self::TilesUpstreamUrl
            | Self::TilesTimeoutSecs
            | Self::TilesChunkSize
            | Self::TilesPipeCapacity => "tiles",
            Self::StoreSeedFile => "store",
            Self::LoggingLevel | Self::LoggingFile => "logging",
        }
    }

    /// Key name within the section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::CacheMaxEntries => "max_entries",
            Self::CacheTtlSecs => "ttl_secs",
            Self::TilesDirectory => "directory",
            Self::TilesExtension => "extension",
            Self::TilesUpstreamUrl => "upstream_url",
            Self::TilesTimeoutSecs => "timeout_secs",
            Self::TilesChunkSize => "chunk_size",
            Self::TilesPipeCapacity => "pipe_capacity",
            Self::StoreSeedFile => "seed_file",
            Self::LoggingLevel => "level",
            Self::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn path(p: &Option<PathBuf>) -> String {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        }

        match self {
            Self::CacheMaxEntries => config.cache.max_entries.to_string(),
            Self::CacheTtlSecs => config.cache.ttl_secs.to_string(),
            Self::TilesDirectory => path(&config.tiles.directory),
            Self::TilesExtension => config.tiles.extension.clone(),
            Self::TilesUpstreamUrl => config.tiles.upstream_url.clone().unwrap_or_default(),
            Self::TilesTimeoutSecs => config.tiles.timeout_secs.to_string(),
            Self::TilesChunkSize => config.tiles.chunk_size.to_string(),
            Self::TilesPipeCapacity => config.tiles.pipe_capacity.to_string(),
            Self::StoreSeedFile => path(&config.store.seed_file),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingFile => path(&config.logging.file),
        }
    }

    /// Validate `value` and store it. An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));

        match self {
            Self::CacheMaxEntries => {
                config.cache.max_entries =
                    positive(value).ok_or_else(|| invalid("expected a positive integer"))?;
            }
            Self::CacheTtlSecs => {
                config.cache.ttl_secs = value
                    .parse()
                    .map_err(|_| invalid("expected seconds, 0 to disable"))?;
            }
            Self::TilesDirectory => config.tiles.directory = optional_path(),
            Self::TilesExtension => {
                let extension = value.trim_start_matches('.');
                if extension.is_empty() || extension.contains('/') {
                    return Err(invalid("expected a file extension such as pbf"));
                }
                config.tiles.extension = extension.to_string();
            }
            Self::TilesUpstreamUrl => {
                if value.is_empty() {
                    config.tiles.upstream_url = None;
                } else {
                    let origin = TileCoordinate::new(0, 0, 0).map_err(|e| invalid(&e.to_string()))?;
                    UpstreamSource::new(value)
                        .url_for(origin)
                        .map_err(|e| invalid(&e.to_string()))?;
                    config.tiles.upstream_url = Some(value.to_string());
                }
            }
            Self::TilesTimeoutSecs => {
                config.tiles.timeout_secs =
                    positive(value).ok_or_else(|| invalid("expected positive seconds"))?;
            }
            Self::TilesChunkSize => {
                config.tiles.chunk_size =
                    positive(value).ok_or_else(|| invalid("expected a positive byte count"))?;
            }
            Self::TilesPipeCapacity => {
                config.tiles.pipe_capacity =
                    positive(value).ok_or_else(|| invalid("expected a positive chunk count"))?;
            }
            Self::StoreSeedFile => config.store.seed_file = optional_path(),
            Self::LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if tracing::Level::from_str(&level).is_err() {
                    return Err(invalid("expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            Self::LoggingFile => config.logging.file = optional_path(),
        }

        Ok(())
    }
}

fn positive<T>(value: &str) -> Option<T>
where
    T: FromStr + Default + PartialOrd,
{
    value.parse::<T>().ok().filter(|n| *n > T::default())
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .find(|key| key.name() == s)
            .copied()
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
