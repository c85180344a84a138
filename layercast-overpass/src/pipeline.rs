//! Sequential orchestration of fetch, normalise, publish, and log.

use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use layercast_core::{LayerCatalog, RegionCatalog, to_canonical_json};
use log::{error, warn};

use crate::error::PipelineError;
use crate::fetch_log::{FetchLog, FetchLogRecord, FetchStatus, LayerStats};
use crate::normalize::{OverpassResponse, normalise};
use crate::publish::replace_file_content;
use crate::query::build_query;
use crate::source::{FetchOutcome, OverpassSource};

/// Default per-pair wall-clock bound.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

/// Filesystem and timing options for a pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Directory the layer files and fetch log are published into.
    pub output_dir: Utf8PathBuf,
    /// Wall-clock bound for one (layer, region) fetch.
    pub deadline: Duration,
}

impl PipelineOptions {
    /// Options targeting `output_dir` with the default deadline.
    #[must_use]
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Override the per-pair deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Tally of one pass over the configured (layer, region) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of pairs attempted.
    pub attempted: u64,
    /// Number of pairs that published output.
    pub succeeded: u64,
}

impl RunSummary {
    fn tally(&mut self, status: FetchStatus) {
        self.attempted += 1;
        if status.is_success() {
            self.succeeded += 1;
        }
    }

    /// Whether at least one pair was attempted and none succeeded.
    ///
    /// Lets a scheduler alert on total failure while tolerating partial
    /// outages.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }
}

/// The fetch-and-publish pipeline for one set of catalogs.
///
/// Pairs are processed independently; any failure is contained to its pair
/// and recorded in the fetch log, so a pass always completes.
#[derive(Debug)]
pub struct Pipeline<S> {
    source: S,
    layers: LayerCatalog,
    regions: RegionCatalog,
    options: PipelineOptions,
}

impl<S: OverpassSource> Pipeline<S> {
    /// Assemble a pipeline from a source, catalogs, and options.
    pub fn new(
        source: S,
        layers: LayerCatalog,
        regions: RegionCatalog,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            layers,
            regions,
            options,
        }
    }

    /// Run one pass over the Cartesian product of layers and regions.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] only when the output directory or the
    /// fetch log cannot be prepared; per-pair failures are recorded, not
    /// raised.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        layercast_fs::ensure_dir(&self.options.output_dir).map_err(|source| {
            PipelineError::OutputDir {
                source,
                path: self.options.output_dir.clone(),
            }
        })?;
        let log = FetchLog::open(&self.options.output_dir)?;
        let mut summary = RunSummary::default();
        for layer in self.layers.names() {
            for region in self.regions.codes() {
                let record = self.fetch_pair(layer, region).await;
                summary.tally(record.fetch_status);
                if let Err(err) = log.append(&record) {
                    error!("dropping log record for {layer}/{region}: {err}");
                }
            }
        }
        Ok(summary)
    }

    /// Fetch, normalise, and publish one (layer, region) pair.
    ///
    /// Always produces a complete log record; the record's status carries
    /// the outcome.
    pub async fn fetch_pair(&self, layer: &str, region: &str) -> FetchLogRecord {
        let started = Utc::now();
        let mut record = FetchLogRecord::begin(layer, region, started);
        let query = match build_query(&self.layers, &self.regions, layer, region) {
            Ok(query) => query,
            Err(err) => {
                // Catalog lookups cannot fail for names taken from the
                // catalogs themselves; an external caller passed a bad name.
                error!("{err}");
                record.fetch_duration_seconds = Some(elapsed_seconds(started));
                record.fetch_status = FetchStatus::Crash;
                return record;
            }
        };
        let outcome = match tokio::time::timeout(self.options.deadline, self.source.fetch(&query))
            .await
        {
            Ok(outcome) => outcome,
            Err(_elapsed) => FetchOutcome::Timeout,
        };
        record.fetch_duration_seconds = Some(elapsed_seconds(started));
        record.fetch_http_status_code = outcome.status_code();
        record.fetch_status = match outcome {
            FetchOutcome::Timeout => FetchStatus::Timeout,
            FetchOutcome::TransportError { url, message } => {
                warn!("fetch of {layer}/{region} from {url} failed: {message}");
                FetchStatus::Fail
            }
            FetchOutcome::Ok { status, .. } if !(200..300).contains(&status) => {
                warn!("fetch of {layer}/{region} returned HTTP {status}");
                FetchStatus::Fail
            }
            FetchOutcome::Ok { body, .. } => match OverpassResponse::parse(&body) {
                Ok(response) => self.publish_pair(layer, region, &response, &mut record),
                Err(err) => {
                    // 200 with a broken body: a known upstream transient.
                    warn!("fetch of {layer}/{region} returned an unparseable body: {err}");
                    FetchStatus::Fail
                }
            },
        };
        record
    }

    fn publish_pair(
        &self,
        layer: &str,
        region: &str,
        response: &OverpassResponse,
        record: &mut FetchLogRecord,
    ) -> FetchStatus {
        let normalised = normalise(response);
        record.stats = Some(LayerStats::from_collection(&normalised.collection));
        if normalised.skipped > 0 {
            record.elements_skipped = Some(normalised.skipped);
        }
        if normalised.collection.is_empty() {
            return FetchStatus::FailNoFeatures;
        }
        let blob = match to_canonical_json(&normalised.collection) {
            Ok(text) => text.into_bytes(),
            Err(err) => {
                error!("failed to serialise {layer}/{region}: {err}");
                return FetchStatus::Crash;
            }
        };
        record.output_bytes = Some(blob.len() as u64);
        let path = self
            .options
            .output_dir
            .join(format!("osm-{layer}-{region}.geojson"));
        match replace_file_content(&path, &blob) {
            Ok(changed) => {
                record.output_changed = Some(changed);
                FetchStatus::Ok
            }
            Err(err) => {
                error!("failed to publish {path}: {err}");
                FetchStatus::Crash
            }
        }
    }
}

fn elapsed_seconds(started: DateTime<Utc>) -> f64 {
    (Utc::now() - started).num_milliseconds() as f64 / 1000.0
}
