//! Tile CLI commands.

use std::path::PathBuf;

use assetgate::app::AssetGate;
use assetgate::tile::{
    HeaderMap, HeaderName, HeaderValue, ProxiedResponse, TileOutcome, TileResponse,
};
use clap::Subcommand;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Tile subcommands.
#[derive(Debug, Subcommand)]
pub enum TileAction {
    /// Fetch a tile, locally first and then from the upstream
    Get {
        /// Zoom level
        zoom: u32,

        /// Column (x)
        column: u32,

        /// Row (y)
        row: u32,

        /// Request header forwarded upstream, as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Write the tile to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip the local store and fetch from the upstream
        #[arg(long)]
        external: bool,

        /// Only look in the local store
        #[arg(long, conflicts_with = "external")]
        local: bool,
    },
}

/// Arguments for `tile get`.
struct GetArgs {
    zoom: u32,
    column: u32,
    row: u32,
    headers: HeaderMap,
    output: Option<PathBuf>,
    external: bool,
    local: bool,
}

/// Run a tile subcommand.
pub fn run(action: TileAction, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let TileAction::Get {
        zoom,
        column,
        row,
        headers,
        output,
        external,
        local,
    } = action;

    let args = GetArgs {
        zoom,
        column,
        row,
        headers: parse_headers(&headers)?,
        output,
        external,
        local,
    };

    let runner = CliRunner::new(config_path)?;
    runner.log_startup("tile");
    let gate = runner.start_gate()?;

    runner.block_on(get(&gate, args))
}

async fn get(gate: &AssetGate, args: GetArgs) -> Result<(), CliError> {
    let (zoom, column, row) = (args.zoom, args.column, args.row);

    if args.external {
        let response = gate
            .get_external_tile(zoom, column, row, &args.headers)
            .await?;
        return write_remote(response, args.output).await;
    }

    if args.local {
        return match gate.get_tile(zoom, column, row).await? {
            TileOutcome::Local(data) => write_local(&data, args.output).await,
            TileOutcome::NoContent => Err(CliError::NotFound(format!(
                "local tile {}/{}/{}",
                zoom, column, row
            ))),
        };
    }

    match gate.resolve_tile(zoom, column, row, &args.headers).await? {
        TileResponse::Local(data) => write_local(&data, args.output).await,
        TileResponse::Remote(response) => write_remote(response, args.output).await,
        TileResponse::NoContent => Err(CliError::NotFound(format!(
            "tile {}/{}/{} (no local tile, no upstream configured)",
            zoom, column, row
        ))),
    }
}

async fn write_local(data: &[u8], output: Option<PathBuf>) -> Result<(), CliError> {
    eprintln!("Local tile ({} bytes)", data.len());
    let mut writer = open_output(output.as_ref()).await?;
    writer.write_all(data).await.map_err(CliError::Output)?;
    writer.flush().await.map_err(CliError::Output)
}

async fn write_remote(response: ProxiedResponse, output: Option<PathBuf>) -> Result<(), CliError> {
    let status = response.status();
    eprintln!(
        "Upstream {} content-type={} content-encoding={}",
        status,
        header_text(response.content_type()),
        header_text(response.content_encoding()),
    );

    let mut writer = open_output(output.as_ref()).await?;
    let written = response.copy_to(&mut writer).await?;
    eprintln!("Wrote {} bytes", written);

    if status.is_success() {
        Ok(())
    } else {
        Err(CliError::UpstreamStatus(status.as_u16()))
    }
}

fn header_text(value: Option<&HeaderValue>) -> &str {
    value.and_then(|v| v.to_str().ok()).unwrap_or("-")
}

async fn open_output(
    path: Option<&PathBuf>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send>, CliError> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .map_err(CliError::Output)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Parse `NAME:VALUE` arguments into a header map.
fn parse_headers(args: &[String]) -> Result<HeaderMap, CliError> {
    let mut headers = HeaderMap::new();

    for arg in args {
        let (name, value) = arg.split_once(':').ok_or_else(|| {
            CliError::InvalidArgument(format!("header '{}' is not NAME:VALUE", arg))
        })?;

        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| CliError::InvalidArgument(format!("invalid header name in '{}'", arg)))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| CliError::InvalidArgument(format!("invalid header value in '{}'", arg)))?;

        headers.append(name, value);
    }

    Ok(headers)
}
