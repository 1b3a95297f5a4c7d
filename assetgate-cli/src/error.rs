//! CLI error type.

use std::fmt;
use std::io;

use assetgate::app::AppError;
use assetgate::asset::AssetTypeError;
use assetgate::config::ConfigError;
use assetgate::logging::LoggingError;
use assetgate::tile::TileError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration problem.
    Config(String),

    /// The application could not start.
    Startup(AppError),

    /// Logging could not be set up.
    Logging(LoggingError),

    /// The Tokio runtime could not be created.
    Runtime(io::Error),

    /// An asset-type operation failed.
    AssetType(AssetTypeError),

    /// A tile operation failed.
    Tile(TileError),

    /// The upstream answered with a non-success status.
    UpstreamStatus(u16),

    /// A requested item does not exist.
    NotFound(String),

    /// A command-line argument could not be used.
    InvalidArgument(String),

    /// Writing output failed.
    Output(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Startup(e) => write!(f, "Failed to start: {}", e),
            CliError::Logging(e) => write!(f, "Failed to set up logging: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::AssetType(e) => write!(f, "{}", e),
            CliError::Tile(e) => write!(f, "{}", e),
            CliError::UpstreamStatus(status) => {
                write!(f, "Upstream answered with status {}", status)
            }
            CliError::NotFound(what) => write!(f, "Not found: {}", what),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Startup(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::AssetType(e) => Some(e),
            CliError::Tile(e) => Some(e),
            CliError::Output(e) => Some(e),
            CliError::Config(_)
            | CliError::UpstreamStatus(_)
            | CliError::NotFound(_)
            | CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Startup(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AssetTypeError> for CliError {
    fn from(e: AssetTypeError) -> Self {
        CliError::AssetType(e)
    }
}

impl From<TileError> for CliError {
    fn from(e: TileError) -> Self {
        CliError::Tile(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_error_message_passes_through() {
        let err: CliError = TileError::Unavailable.into();
        assert_eq!(err.to_string(), "Tile unavailable");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigError::UnknownKey("tiles.nope".to_string()).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("tiles.nope"));
    }
}
