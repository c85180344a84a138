//! Error types emitted by the layercast CLI.

use std::sync::Arc;

use layercast_overpass::PipelineError;
use thiserror::Error;

/// Errors emitted by the layercast CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The async runtime could not be built.
    #[error("failed to start the async runtime: {source}")]
    Runtime {
        #[source]
        source: std::io::Error,
    },
    /// Preparing the output directory or the fetch log failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Every configured layer/region pair failed to publish.
    #[error("all {attempted} layer/region fetches failed; see the fetch log")]
    AllPairsFailed {
        /// Number of pairs that were attempted.
        attempted: u64,
    },
}
