//! Asset-type CLI commands.

use std::path::PathBuf;

use assetgate::app::AssetGate;
use clap::Subcommand;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Asset-type subcommands.
#[derive(Debug, Subcommand)]
pub enum AssetAction {
    /// List every asset type
    List,

    /// Show one asset type as JSON
    Get {
        /// Asset type identifier
        id: String,
    },

    /// Delete an asset type
    Delete {
        /// Asset type identifier
        id: String,
    },
}

/// Run an asset subcommand.
pub fn run(action: AssetAction, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("asset");
    let gate = runner.start_gate()?;

    runner.block_on(execute(&gate, action))
}

async fn execute(gate: &AssetGate, action: AssetAction) -> Result<(), CliError> {
    match action {
        AssetAction::List => {
            let records = gate.get_all_asset_types().await?;
            if records.is_empty() {
                println!("No asset types.");
            }
            for record in records.iter() {
                println!("{}\t{}", record.id(), record.descriptor().name);
            }
            Ok(())
        }
        AssetAction::Get { id } => {
            let record = gate
                .get_asset_type(&id)
                .await?
                .ok_or_else(|| CliError::NotFound(format!("asset type '{}'", id)))?;
            println!("{}", to_json(&*record)?);
            Ok(())
        }
        AssetAction::Delete { id } => {
            if gate.delete_asset_type(&id).await? {
                println!("Deleted asset type '{}'", id);
                Ok(())
            } else {
                Err(CliError::NotFound(format!("asset type '{}'", id)))
            }
        }
    }
}

/// Print the published asset descriptors as JSON.
pub fn run_descriptors(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("descriptors");
    let gate = runner.start_gate()?;

    let descriptors = runner.block_on(gate.get_asset_descriptors());
    println!("{}", to_json(&descriptors)?);
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Output(std::io::Error::other(e)))
}
