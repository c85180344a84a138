//! Static configuration catalogs for regions and layers.
//!
//! Regions and layers are explicit objects handed to the pipeline at
//! construction time, so tests and embedders can run independent instances
//! with different configurations.

use std::collections::BTreeMap;
use std::fmt;

use geo::{Coord, Rect};
use thiserror::Error;

/// A named rectangular bounding box in WGS84 degrees.
///
/// The box is stored as a [`geo::Rect`] with `x = longitude` and
/// `y = latitude`, matching the convention used throughout the workspace.
///
/// # Examples
/// ```
/// use layercast_core::BoundingBox;
///
/// # fn main() -> Result<(), layercast_core::BoundingBoxError> {
/// let switzerland = BoundingBox::new(45.6, 5.4, 47.99, 11.2)?;
/// assert_eq!(switzerland.south(), 45.6);
/// assert_eq!(switzerland.east(), 11.2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    rect: Rect<f64>,
}

/// Errors returned by [`BoundingBox::new`].
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum BoundingBoxError {
    /// A coordinate was NaN or infinite.
    #[error("bounding box coordinates must be finite")]
    NonFinite,
    /// The south edge was not strictly below the north edge.
    #[error("latitude span is empty or inverted: {south}..{north}")]
    LatitudeOrder {
        /// Southern edge as supplied.
        south: f64,
        /// Northern edge as supplied.
        north: f64,
    },
    /// The west edge was not strictly left of the east edge.
    #[error("longitude span is empty or inverted: {west}..{east}")]
    LongitudeOrder {
        /// Western edge as supplied.
        west: f64,
        /// Eastern edge as supplied.
        east: f64,
    },
}

impl BoundingBox {
    /// Construct a bounding box from `(south, west, north, east)` edges.
    ///
    /// # Errors
    ///
    /// Returns [`BoundingBoxError`] when a coordinate is not finite or the
    /// edges are empty or inverted.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, BoundingBoxError> {
        if ![south, west, north, east].iter().all(|v| v.is_finite()) {
            return Err(BoundingBoxError::NonFinite);
        }
        if south >= north {
            return Err(BoundingBoxError::LatitudeOrder { south, north });
        }
        if west >= east {
            return Err(BoundingBoxError::LongitudeOrder { west, east });
        }
        Ok(Self {
            rect: Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north }),
        })
    }

    /// Southern edge in degrees latitude.
    #[must_use]
    pub fn south(&self) -> f64 {
        self.rect.min().y
    }

    /// Western edge in degrees longitude.
    #[must_use]
    pub fn west(&self) -> f64 {
        self.rect.min().x
    }

    /// Northern edge in degrees latitude.
    #[must_use]
    pub fn north(&self) -> f64 {
        self.rect.max().y
    }

    /// Eastern edge in degrees longitude.
    #[must_use]
    pub fn east(&self) -> f64 {
        self.rect.max().x
    }

    /// Midpoint of the box, used as the relation fallback location.
    #[must_use]
    pub fn centre(&self) -> Coord<f64> {
        self.rect.center()
    }
}

/// A tag-equality expression selecting the members of a layer.
///
/// # Examples
/// ```
/// use layercast_core::TagFilter;
///
/// let filter = TagFilter::new("historic=castle");
/// assert_eq!(filter.as_ref(), "historic=castle");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter(String);

impl TagFilter {
    /// Construct a new [`TagFilter`] from an owned or borrowed string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Consume the wrapper and return the inner [`String`].
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for TagFilter {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for TagFilter {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised when a layer or region name is not configured.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// The requested layer name has no catalog entry.
    #[error("unknown layer {0:?}")]
    UnknownLayer(String),
    /// The requested region code has no catalog entry.
    #[error("unknown region {0:?}")]
    UnknownRegion(String),
}

/// Ordered map of region code to bounding box.
///
/// Iteration order is the lexicographic order of the codes, which keeps a
/// pipeline pass deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCatalog(BTreeMap<String, BoundingBox>);

impl RegionCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in regions: `CH` (Switzerland).
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        // ISO 3166-1/2 codes, e.g. 'CH' for Switzerland, 'DE-BY' for Bavaria.
        if let Ok(bounds) = BoundingBox::new(45.6, 5.4, 47.99, 11.2) {
            catalog.insert("CH", bounds);
        }
        catalog
    }

    /// Add or replace a region.
    pub fn insert(&mut self, code: impl Into<String>, bounds: BoundingBox) {
        self.0.insert(code.into(), bounds);
    }

    /// Look up a region by code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&BoundingBox> {
        self.0.get(code)
    }

    /// Look up a region, failing with a [`ConfigurationError`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownRegion`] when the code is not
    /// configured.
    pub fn require(&self, code: &str) -> Result<&BoundingBox, ConfigurationError> {
        self.get(code)
            .ok_or_else(|| ConfigurationError::UnknownRegion(code.to_owned()))
    }

    /// Iterate over the configured region codes in lexicographic order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of configured regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered map of layer name to tag filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerCatalog(BTreeMap<String, TagFilter>);

impl LayerCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in layers: `castles`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert("castles", TagFilter::new("historic=castle"));
        catalog
    }

    /// Add or replace a layer.
    pub fn insert(&mut self, name: impl Into<String>, filter: TagFilter) {
        self.0.insert(name.into(), filter);
    }

    /// Look up a layer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TagFilter> {
        self.0.get(name)
    }

    /// Look up a layer, failing with a [`ConfigurationError`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownLayer`] when the name is not
    /// configured.
    pub fn require(&self, name: &str) -> Result<&TagFilter, ConfigurationError> {
        self.get(name)
            .ok_or_else(|| ConfigurationError::UnknownLayer(name.to_owned()))
    }

    /// Iterate over the configured layer names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of configured layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
