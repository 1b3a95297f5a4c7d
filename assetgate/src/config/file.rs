//! INI-backed configuration file.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::keys::ConfigKey;
use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::tile::{DEFAULT_CHUNK_SIZE, DEFAULT_PIPE_CAPACITY, DEFAULT_TIMEOUT_SECS};

/// Errors loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or parsed.
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The file could not be written.
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A setting has a value that cannot be used.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// No setting with this name exists.
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Directory holding the configuration file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("assetgate")
}

/// Default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum entries per cache namespace.
    pub max_entries: u64,
    /// Entry time-to-live in seconds; 0 disables expiry.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: 0,
        }
    }
}

/// `[tiles]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSettings {
    /// Root of the local tile tree; `None` means no local tiles.
    pub directory: Option<PathBuf>,
    /// Tile file extension, without the dot.
    pub extension: String,
    /// Upstream URL template; `None` disables remote fetches.
    pub upstream_url: Option<String>,
    /// Upstream timeout in seconds.
    pub timeout_secs: u64,
    /// Relayed chunk size in bytes.
    pub chunk_size: usize,
    /// Chunks buffered between upstream and consumer.
    pub pipe_capacity: usize,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            directory: None,
            extension: "pbf".to_string(),
            upstream_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSettings {
    /// JSON file of asset-type records loaded at startup.
    pub seed_file: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default log level, overridden by `RUST_LOG`.
    pub level: String,
    /// Optional log file in addition to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub tiles: TileSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default path. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to the default path, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories if needed.
    ///
    /// Unset optional values are omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(write_error)
    }
}
