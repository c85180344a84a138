//! The append-only structured fetch log.
//!
//! One single-line canonical-JSON record per fetch attempt, flushed and
//! fsynced before the append returns so records survive a crash immediately
//! after being written. Prior records are never rewritten.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8;
use chrono::{DateTime, SecondsFormat, Utc};
use layercast_core::{FeatureCollection, to_canonical_json};
use serde::Serialize;
use thiserror::Error;

/// File name of the fetch log inside the output directory.
pub const FETCH_LOG_FILE_NAME: &str = "fetch_layers.log";

/// Cap on the per-key counters carried into a log record.
const MOST_COMMON_LIMIT: usize = 1000;

/// Resulting status of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Features were fetched, normalised, and published.
    Ok,
    /// Transport failure, non-2xx status, or unparseable body.
    Fail,
    /// HTTP success but zero features, a suspected upstream transient bug.
    #[serde(rename = "fail_nofeatures")]
    FailNoFeatures,
    /// The wall-clock deadline elapsed.
    Timeout,
    /// A local failure after a good fetch (serialisation or I/O).
    Crash,
}

impl FetchStatus {
    /// Whether the attempt published output.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Errors raised while appending to the fetch log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchLogError {
    /// The log file could not be opened.
    #[error("failed to open fetch log at {path}: {source}")]
    Open {
        /// Underlying I/O error.
        source: io::Error,
        /// Location of the log file.
        path: Utf8PathBuf,
    },
    /// A record could not be serialised to JSON.
    #[error("failed to serialise log record: {source}")]
    Serialise {
        /// Underlying serialisation error.
        source: serde_json::Error,
    },
    /// Writing or syncing the record failed.
    #[error("failed to append to fetch log at {path}: {source}")]
    Append {
        /// Underlying I/O error.
        source: io::Error,
        /// Location of the log file.
        path: Utf8PathBuf,
    },
}

/// Summary statistics for one normalised feature collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStats {
    /// Count per geometry type, capped to the most common entries.
    pub geometry_type_most_common: BTreeMap<String, u64>,
    /// Count per property key, capped to the most common entries.
    pub tags_most_common: BTreeMap<String, u64>,
    /// Number of distinct property keys seen.
    pub tags_total: u64,
    /// Base-data timestamp of the response, when the server reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm_base_timestamp: Option<String>,
}

impl LayerStats {
    /// Compute summary statistics for `collection`.
    #[must_use]
    pub fn from_collection(collection: &FeatureCollection) -> Self {
        let mut geometry_types: HashMap<&str, u64> = HashMap::new();
        let mut tags: HashMap<&str, u64> = HashMap::new();
        for feature in &collection.features {
            *geometry_types
                .entry(feature.geometry.type_name())
                .or_insert(0) += 1;
            for key in feature.properties.keys() {
                *tags.entry(key.as_str()).or_insert(0) += 1;
            }
        }
        let tags_total = tags.len() as u64;
        Self {
            geometry_type_most_common: most_common(geometry_types),
            tags_most_common: most_common(tags),
            tags_total,
            osm_base_timestamp: collection.osm_base_timestamp.clone(),
        }
    }
}

fn most_common(counters: HashMap<&str, u64>) -> BTreeMap<String, u64> {
    let mut entries: Vec<(&str, u64)> = counters.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(MOST_COMMON_LIMIT)
        .map(|(key, count)| (key.to_owned(), count))
        .collect()
}

/// One structured record describing a fetch attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchLogRecord {
    /// Layer name.
    pub layer: String,
    /// Region code.
    pub region: String,
    /// RFC 3339 timestamp of the start of the attempt.
    pub fetch_start_timestamp: String,
    /// Wall-clock duration of the attempt in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_duration_seconds: Option<f64>,
    /// HTTP-like status code; absent when the deadline elapsed first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_http_status_code: Option<u16>,
    /// Final status of the attempt.
    pub fetch_status: FetchStatus,
    /// Geometry and tag statistics, when a body was normalised.
    #[serde(flatten)]
    pub stats: Option<LayerStats>,
    /// Size of the serialised output in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
    /// Whether the published file was actually replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_changed: Option<bool>,
    /// Number of malformed elements skipped during normalisation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements_skipped: Option<u64>,
}

impl FetchLogRecord {
    /// Start a record for one attempt.
    ///
    /// The status starts out as [`FetchStatus::Crash`] and is overwritten
    /// when the attempt concludes; `Crash` is what gets recorded if the
    /// pipeline gave up midway.
    #[must_use]
    pub fn begin(layer: &str, region: &str, started: DateTime<Utc>) -> Self {
        Self {
            layer: layer.to_owned(),
            region: region.to_owned(),
            fetch_start_timestamp: started.to_rfc3339_opts(SecondsFormat::Micros, true),
            fetch_duration_seconds: None,
            fetch_http_status_code: None,
            fetch_status: FetchStatus::Crash,
            stats: None,
            output_bytes: None,
            output_changed: None,
            elements_skipped: None,
        }
    }
}

/// Append-only handle on the shared fetch log file.
#[derive(Debug)]
pub struct FetchLog {
    dir: fs_utf8::Dir,
    file_name: String,
    path: Utf8PathBuf,
}

impl FetchLog {
    /// Open (or lazily create) the fetch log inside `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchLogError::Open`] when the directory cannot be
    /// resolved.
    pub fn open(output_dir: &Utf8Path) -> Result<Self, FetchLogError> {
        let path = output_dir.join(FETCH_LOG_FILE_NAME);
        let (dir, file_name) =
            layercast_fs::open_dir_and_file(&path).map_err(|source| FetchLogError::Open {
                source,
                path: path.clone(),
            })?;
        Ok(Self {
            dir,
            file_name,
            path,
        })
    }

    /// Append one newline-terminated record and force it to durable storage.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchLogError`] when serialisation, the write, or the
    /// fsync fails; prior records are unaffected either way.
    pub fn append(&self, record: &FetchLogRecord) -> Result<(), FetchLogError> {
        let line =
            to_canonical_json(record).map_err(|source| FetchLogError::Serialise { source })?;
        let io_err = |source| FetchLogError::Append {
            source,
            path: self.path.clone(),
        };
        let mut file = self
            .dir
            .open_with(
                &self.file_name,
                OpenOptions::new().create(true).append(true),
            )
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.write_all(b"\n").map_err(io_err)?;
        file.flush().map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(())
    }

    /// Location of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
