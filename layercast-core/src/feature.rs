//! GeoJSON output types.
//!
//! The structs here serialise directly to the GeoJSON wire shapes
//! (`Feature`, `FeatureCollection`, and the geometry objects). Serialisation
//! is hand-written so the `"type"` discriminators come out as constants and
//! coordinates come out as `[lon, lat]` arrays rather than `{x, y}` maps.

use std::collections::BTreeMap;
use std::fmt;

use geo::Coord;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Flat string-to-string property mapping attached to a feature.
///
/// Backed by a `BTreeMap` so iteration (and therefore serialisation) is
/// key-sorted without a separate step.
pub type Properties = BTreeMap<String, String>;

/// Property key carrying the prefixed OSM element id (`N1`, `W2`, `R3`).
pub const ELEMENT_ID_PROPERTY: &str = ".id";

/// A prefixed OSM element identifier.
///
/// # Examples
/// ```
/// use layercast_core::ElementId;
///
/// assert_eq!(ElementId::node(1).to_string(), "N1");
/// assert_eq!(ElementId::relation(42).to_string(), "R42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementId {
    prefix: char,
    id: u64,
}

impl ElementId {
    /// Identifier of a node element.
    #[must_use]
    pub fn node(id: u64) -> Self {
        Self { prefix: 'N', id }
    }

    /// Identifier of a way element.
    #[must_use]
    pub fn way(id: u64) -> Self {
        Self { prefix: 'W', id }
    }

    /// Identifier of a relation element.
    #[must_use]
    pub fn relation(id: u64) -> Self {
        Self { prefix: 'R', id }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.id)
    }
}

/// Geometry of one output feature.
///
/// Coordinates follow GeoJSON order: `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Coord<f64>),
    /// An open sequence of positions.
    LineString(Vec<Coord<f64>>),
    /// One or more closed linear rings, exterior first.
    Polygon(Vec<Vec<Coord<f64>>>),
}

impl Geometry {
    /// GeoJSON type discriminator (`Point`, `LineString`, `Polygon`).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
        }
    }
}

/// One output unit: a geometry plus its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The normalised geometry.
    pub geometry: Geometry,
    /// Element tags plus the [`ELEMENT_ID_PROPERTY`] entry.
    pub properties: Properties,
}

impl Feature {
    /// Build a feature from element tags, stamping in the `.id` property.
    #[must_use]
    pub fn from_element(geometry: Geometry, mut tags: Properties, id: ElementId) -> Self {
        tags.insert(ELEMENT_ID_PROPERTY.to_owned(), id.to_string());
        Self {
            geometry,
            properties: tags,
        }
    }
}

/// Ordered sequence of features plus collection-level metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// Features in normalisation order: nodes, then ways, then relations.
    pub features: Vec<Feature>,
    /// Base-data timestamp reported by the Overpass response, when present.
    pub osm_base_timestamp: Option<String>,
}

impl FeatureCollection {
    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of features in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }
}

/// Serialises a coordinate as a `[lon, lat]` pair.
struct Position(Coord<f64>);

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.0.x)?;
        seq.serialize_element(&self.0.y)?;
        seq.end()
    }
}

struct PositionList<'a>(&'a [Coord<f64>]);

impl Serialize for PositionList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for coord in self.0 {
            seq.serialize_element(&Position(*coord))?;
        }
        seq.end()
    }
}

struct RingList<'a>(&'a [Vec<Coord<f64>>]);

impl Serialize for RingList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for ring in self.0 {
            seq.serialize_element(&PositionList(ring))?;
        }
        seq.end()
    }
}

impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            Self::Point(coord) => map.serialize_entry("coordinates", &Position(*coord))?,
            Self::LineString(coords) => map.serialize_entry("coordinates", &PositionList(coords))?,
            Self::Polygon(rings) => map.serialize_entry("coordinates", &RingList(rings))?,
        }
        map.end()
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "Feature")?;
        map.serialize_entry("geometry", &self.geometry)?;
        map.serialize_entry("properties", &self.properties)?;
        map.end()
    }
}

impl Serialize for FeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = if self.osm_base_timestamp.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry("type", "FeatureCollection")?;
        map.serialize_entry("features", &self.features)?;
        if let Some(timestamp) = &self.osm_base_timestamp {
            let properties = BTreeMap::from([("osm_base_timestamp", timestamp.as_str())]);
            map.serialize_entry("properties", &properties)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_canonical_json;

    fn castle_point() -> Feature {
        Feature::from_element(
            Geometry::Point(Coord { x: 8.0, y: 47.0 }),
            Properties::from([("historic".to_owned(), "castle".to_owned())]),
            ElementId::node(1),
        )
    }

    #[test]
    fn element_id_uses_one_letter_prefixes() {
        assert_eq!(ElementId::node(7).to_string(), "N7");
        assert_eq!(ElementId::way(7).to_string(), "W7");
        assert_eq!(ElementId::relation(7).to_string(), "R7");
    }

    #[test]
    fn from_element_stamps_the_id_property() {
        let feature = castle_point();
        assert_eq!(
            feature.properties.get(ELEMENT_ID_PROPERTY).map(String::as_str),
            Some("N1")
        );
        assert_eq!(
            feature.properties.get("historic").map(String::as_str),
            Some("castle")
        );
    }

    #[test]
    fn point_feature_serialises_to_sorted_compact_geojson() {
        let json = to_canonical_json(&castle_point()).expect("serialises");
        assert_eq!(
            json,
            "{\"geometry\":{\"coordinates\":[8.0,47.0],\"type\":\"Point\"},\
             \"properties\":{\".id\":\"N1\",\"historic\":\"castle\"},\"type\":\"Feature\"}"
        );
    }

    #[test]
    fn collection_serialises_base_timestamp_under_properties() {
        let collection = FeatureCollection {
            features: vec![castle_point()],
            osm_base_timestamp: Some("2019-05-01T00:00:00Z".to_owned()),
        };
        let json = to_canonical_json(&collection).expect("serialises");
        assert!(json.starts_with("{\"features\":["));
        assert!(json.contains("\"properties\":{\"osm_base_timestamp\":\"2019-05-01T00:00:00Z\"}"));
        assert!(json.ends_with("\"type\":\"FeatureCollection\"}"));
    }

    #[test]
    fn empty_collection_omits_properties() {
        let json = to_canonical_json(&FeatureCollection::default()).expect("serialises");
        assert_eq!(json, "{\"features\":[],\"type\":\"FeatureCollection\"}");
    }

    #[test]
    fn polygon_serialises_nested_rings() {
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        let feature = Feature::from_element(
            Geometry::Polygon(vec![ring]),
            Properties::new(),
            ElementId::way(2),
        );
        let json = to_canonical_json(&feature).expect("serialises");
        assert!(json.contains(
            "\"coordinates\":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]"
        ));
        assert!(json.contains("\"type\":\"Polygon\""));
    }
}
