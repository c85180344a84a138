//! Error types produced by the pipeline runner.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::fetch_log::FetchLogError;

/// Errors that abort a whole pipeline pass before any pair is attempted.
///
/// Per-pair failures never surface here; they are contained and recorded in
/// the fetch log instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The output directory could not be created or opened.
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        /// Underlying I/O error.
        source: io::Error,
        /// The configured output directory.
        path: Utf8PathBuf,
    },
    /// The fetch log could not be opened.
    #[error(transparent)]
    Log(#[from] FetchLogError),
}
