//! AssetGate CLI - Command-line interface
//!
//! Inspects the asset-type cache and fetches map tiles through the gateway
//! using the settings in `config.ini`.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::asset::AssetAction;
use commands::config::ConfigCommands;
use commands::tile::TileAction;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "assetgate", version, about = "Asset-type cache and map tile gateway")]
struct Cli {
    /// Configuration file (defaults to ~/.config/assetgate/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query or delete asset types
    Asset {
        #[command(subcommand)]
        action: AssetAction,
    },

    /// Print the published asset descriptors as JSON
    Descriptors,

    /// Fetch map tiles
    Tile {
        #[command(subcommand)]
        action: TileAction,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Asset { action } => commands::asset::run(action, cli.config),
        Commands::Descriptors => commands::asset::run_descriptors(cli.config),
        Commands::Tile { action } => commands::tile::run(action, cli.config),
        Commands::Config { command } => commands::config::run(command, cli.config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
