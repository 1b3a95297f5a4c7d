//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.config/assetgate/config.ini` (or the
//! platform equivalent). A missing file means defaults. Every setting is
//! addressable as `section.key` through [`ConfigKey`], which is what the CLI
//! `config get/set/list` commands use.
//!
//! ```ini
//! [cache]
//! max_entries = 10000
//! ttl_secs = 0
//!
//! [tiles]
//! directory = /srv/tiles
//! extension = pbf
//! upstream_url = https://tiles.example/{z}/{x}/{y}.pbf
//! timeout_secs = 10
//!
//! [logging]
//! level = info
//! ```

mod file;
mod keys;

pub use file::{
    config_directory, config_file_path, CacheSettings, ConfigError, ConfigFile, LoggingSettings,
    StoreSettings, TileSettings,
};
pub use keys::ConfigKey;
