//! Core domain types for the Layercast fetch pipeline.
//!
//! These models provide basic validation to keep downstream
//! components honest. Constructors return `Result` to surface
//! invalid input early.

#![forbid(unsafe_code)]

mod catalog;
mod feature;
mod json;
mod ring;

pub use catalog::{
    BoundingBox, BoundingBoxError, ConfigurationError, LayerCatalog, RegionCatalog, TagFilter,
};
pub use feature::{
    ELEMENT_ID_PROPERTY, ElementId, Feature, FeatureCollection, Geometry, Properties,
};
pub use json::to_canonical_json;
pub use ring::{RingRole, is_closed, orient_ring, shoelace_sum};
