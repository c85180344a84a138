//! The Overpass fetch-and-publish pipeline.
//!
//! Responsibilities:
//! - Build Overpass QL queries from the configured catalogs.
//! - Fetch query results over HTTP without ever raising for transport faults.
//! - Normalise nodes, ways, and relations into valid GeoJSON features.
//! - Publish collections with crash-safe atomic replacement.
//! - Record one durable structured log record per fetch attempt.
//!
//! Boundaries:
//! - Domain types and winding rules live in `layercast-core`.
//! - Filesystem capability plumbing lives in `layercast-fs`.
//!
//! Invariants:
//! - A failure in one (layer, region) pair never aborts the pass.
//! - The published file is only ever replaced wholesale, never truncated.

#![forbid(unsafe_code)]

mod error;
mod fetch_log;
mod normalize;
mod pipeline;
mod publish;
mod query;
mod source;

#[cfg(any(test, doc))]
mod test_support;
#[cfg(any(test, doc))]
pub use test_support::{PendingSource, StubSource, block_on_for_tests};

pub use error::PipelineError;
pub use fetch_log::{
    FETCH_LOG_FILE_NAME, FetchLog, FetchLogError, FetchLogRecord, FetchStatus, LayerStats,
};
pub use normalize::{NormalisedLayer, OverpassResponse, RawElement, normalise};
pub use pipeline::{DEFAULT_DEADLINE, Pipeline, PipelineOptions, RunSummary};
pub use publish::replace_file_content;
pub use query::build_query;
pub use source::{
    DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, FetchOutcome, HttpOverpassSource, NETWORK_ERROR_STATUS,
    OverpassSource,
};

#[cfg(test)]
mod tests;
