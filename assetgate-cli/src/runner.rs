//! Shared setup for commands that need the running application.

use std::future::Future;
use std::path::PathBuf;

use assetgate::app::{AppConfig, AssetGate};
use assetgate::config::{config_file_path, ConfigFile};
use assetgate::logging::{init_logging, LoggingConfig, LoggingGuard};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Loads configuration, installs logging and owns the runtime.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Set up from `config_path`, or the default path when `None`.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config_path = config_path.unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;
        let logging = init_logging(&LoggingConfig::from(&config.logging))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            config_path,
            runtime,
            _logging: logging,
        })
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = assetgate::VERSION,
            command,
            config = %self.config_path.display(),
            "assetgate starting"
        );
    }

    /// Start the application from the loaded configuration.
    pub fn start_gate(&self) -> Result<AssetGate, CliError> {
        let config = AppConfig::from_config_file(&self.config);
        Ok(AssetGate::start(config)?)
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
