//! Command-line interface for the layercast fetch pipeline.
#![forbid(unsafe_code)]

mod error;

pub use error::CliError;

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use layercast_core::{LayerCatalog, RegionCatalog};
use layercast_overpass::{
    DEFAULT_DEADLINE, DEFAULT_ENDPOINT, HttpOverpassSource, Pipeline, PipelineOptions,
};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

const ARG_OUTPUT_DIR: &str = "output-dir";
const ENV_OUTPUT_DIR: &str = "LAYERCAST_CMDS_FETCH_OUTPUT_DIR";

/// Run the layercast CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when argument parsing, configuration merging, or
/// the fetch pass fails outright. Per-pair fetch failures are recorded in
/// the fetch log; only a pass where every pair failed is reported here.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Fetch(args) => run_fetch(args),
    }
}

fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let source = HttpOverpassSource::new(config.endpoint.clone());
    let pipeline = Pipeline::new(
        source,
        LayerCatalog::builtin(),
        RegionCatalog::builtin(),
        PipelineOptions::new(config.output_dir.clone()).with_deadline(config.deadline),
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| CliError::Runtime { source })?;
    let summary = runtime.block_on(pipeline.run())?;
    info!(
        "published {} of {} layer/region pairs",
        summary.succeeded, summary.attempted
    );
    if summary.all_failed() {
        return Err(CliError::AllPairsFailed {
            attempted: summary.attempted,
        });
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "layercast",
    about = "Fetch OpenStreetMap layers and publish them as GeoJSON",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch every configured layer for every configured region.
    Fetch(FetchArgs),
}

/// CLI arguments for the `fetch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch every configured layer for every configured region \
                 and publish the results as GeoJSON. Options can come from \
                 CLI flags, configuration files, or environment variables.",
    about = "Fetch the configured layers from the Overpass API"
)]
#[ortho_config(prefix = "LAYERCAST")]
struct FetchArgs {
    /// Directory the layer files and fetch log are published into.
    #[arg(long = ARG_OUTPUT_DIR, value_name = "path")]
    #[serde(default)]
    output_dir: Option<Utf8PathBuf>,
    /// Overpass API endpoint URL.
    #[arg(long = "endpoint", value_name = "url")]
    #[serde(default)]
    endpoint: Option<String>,
    /// Wall-clock bound for one layer/region fetch, in seconds.
    #[arg(long = "deadline-seconds", value_name = "seconds")]
    #[serde(default)]
    deadline_seconds: Option<u64>,
}

impl FetchArgs {
    fn into_config(self) -> Result<FetchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FetchConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchConfig {
    output_dir: Utf8PathBuf,
    endpoint: String,
    deadline: Duration,
}

impl TryFrom<FetchArgs> for FetchConfig {
    type Error = CliError;

    fn try_from(args: FetchArgs) -> Result<Self, Self::Error> {
        let output_dir = args.output_dir.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT_DIR,
            env: ENV_OUTPUT_DIR,
        })?;
        Ok(Self {
            output_dir,
            endpoint: args
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            deadline: args
                .deadline_seconds
                .map_or(DEFAULT_DEADLINE, Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests;
