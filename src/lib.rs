//! Facade crate for the layercast fetch pipeline.
//!
//! This crate re-exports the domain types and the pipeline surface so
//! embedders depend on one crate instead of the individual workspace
//! members.

#![forbid(unsafe_code)]

pub use layercast_core::{
    BoundingBox, BoundingBoxError, ConfigurationError, ElementId, Feature, FeatureCollection,
    Geometry, LayerCatalog, Properties, RegionCatalog, TagFilter, to_canonical_json,
};
pub use layercast_overpass::{
    DEFAULT_DEADLINE, DEFAULT_ENDPOINT, FetchLog, FetchLogRecord, FetchOutcome, FetchStatus,
    HttpOverpassSource, OverpassSource, Pipeline, PipelineError, PipelineOptions, RunSummary,
    build_query, normalise,
};
