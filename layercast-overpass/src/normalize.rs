//! Geometry normalisation from Overpass elements to GeoJSON features.
//!
//! Relations are only partially modelled: a relation with exactly one
//! outer-way member becomes a polygon (holes included), anything else falls
//! back to a point at the centre of its bounding box. Full multipolygon
//! assembly is a non-goal.
//!
//! Malformed elements (degenerate ways, unclosed rings, fallback relations
//! without bounds) are skipped with a warning and counted, so one bad
//! element cannot sink the rest of the layer.

use geo::Coord;
use layercast_core::{
    ElementId, Feature, FeatureCollection, Geometry, Properties, RingRole, is_closed, orient_ring,
};
use log::warn;
use serde::Deserialize;

/// A closed ring needs at least a triangle plus the repeated closing point.
const MIN_RING_POINTS: usize = 4;

/// Parsed Overpass response envelope.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Raw elements in response order.
    #[serde(default)]
    pub elements: Vec<RawElement>,
    #[serde(default)]
    osm3s: Option<Osm3s>,
}

#[derive(Debug, Deserialize)]
struct Osm3s {
    #[serde(default)]
    timestamp_osm_base: Option<String>,
}

impl OverpassResponse {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the body is not a
    /// valid Overpass JSON envelope.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Base-data timestamp reported by the server, when present.
    #[must_use]
    pub fn base_timestamp(&self) -> Option<&str> {
        self.osm3s
            .as_ref()
            .and_then(|meta| meta.timestamp_osm_base.as_deref())
    }
}

/// One raw element from the Overpass `elements` array.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawElement {
    /// A single tagged point.
    Node {
        /// OSM node id.
        id: u64,
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
        /// Tag mapping.
        #[serde(default)]
        tags: Properties,
    },
    /// An ordered sequence of points.
    Way {
        /// OSM way id.
        id: u64,
        /// Point sequence as returned by `out geom`.
        #[serde(default)]
        geometry: Vec<RawPoint>,
        /// Tag mapping.
        #[serde(default)]
        tags: Properties,
    },
    /// A group of members with roles.
    Relation {
        /// OSM relation id.
        id: u64,
        /// Tag mapping.
        #[serde(default)]
        tags: Properties,
        /// Ordered member list.
        #[serde(default)]
        members: Vec<RawMember>,
        /// Bounding box reported by Overpass.
        #[serde(default)]
        bounds: Option<RawBounds>,
    },
}

/// A latitude/longitude pair from a way or member geometry.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl RawPoint {
    fn coord(self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// One relation member.
#[derive(Debug, Deserialize)]
pub struct RawMember {
    /// Member role (`outer`, `inner`, or anything else).
    #[serde(default)]
    pub role: String,
    /// Member element type (`node`, `way`, `relation`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Member geometry when the member is a way.
    #[serde(default)]
    pub geometry: Vec<RawPoint>,
}

impl RawMember {
    fn is_way_with_role(&self, role: &str) -> bool {
        self.role == role && self.kind == "way"
    }
}

/// Relation bounding box; fields are optional so one truncated element
/// cannot fail the whole response parse.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawBounds {
    #[serde(default)]
    minlat: Option<f64>,
    #[serde(default)]
    minlon: Option<f64>,
    #[serde(default)]
    maxlat: Option<f64>,
    #[serde(default)]
    maxlon: Option<f64>,
}

impl RawBounds {
    fn centre(self) -> Option<Coord<f64>> {
        let (minlat, minlon) = (self.minlat?, self.minlon?);
        let (maxlat, maxlon) = (self.maxlat?, self.maxlon?);
        Some(Coord {
            x: minlon + (maxlon - minlon) / 2.0,
            y: minlat + (maxlat - minlat) / 2.0,
        })
    }
}

/// Result of normalising one response.
#[derive(Debug, Default)]
pub struct NormalisedLayer {
    /// The features that survived normalisation.
    pub collection: FeatureCollection,
    /// Number of malformed elements or rings that were skipped.
    pub skipped: u64,
}

/// Normalise a parsed Overpass response into a GeoJSON feature collection.
///
/// Features are emitted grouped by element type (nodes, then ways, then
/// relations) so the output order is stable across responses.
#[must_use]
pub fn normalise(response: &OverpassResponse) -> NormalisedLayer {
    let mut normaliser = Normaliser::default();
    for element in &response.elements {
        if let RawElement::Node { id, lat, lon, tags } = element {
            normaliser.node(*id, *lat, *lon, tags.clone());
        }
    }
    for element in &response.elements {
        if let RawElement::Way { id, geometry, tags } = element {
            normaliser.way(*id, geometry, tags.clone());
        }
    }
    for element in &response.elements {
        if let RawElement::Relation {
            id,
            tags,
            members,
            bounds,
        } = element
        {
            normaliser.relation(*id, tags.clone(), members, *bounds);
        }
    }
    NormalisedLayer {
        collection: FeatureCollection {
            features: normaliser.features,
            osm_base_timestamp: response.base_timestamp().map(str::to_owned),
        },
        skipped: normaliser.skipped,
    }
}

#[derive(Default)]
struct Normaliser {
    features: Vec<Feature>,
    skipped: u64,
}

impl Normaliser {
    fn skip(&mut self, id: ElementId, reason: &str) {
        warn!("skipping {id}: {reason}");
        self.skipped += 1;
    }

    fn node(&mut self, id: u64, lat: f64, lon: f64, tags: Properties) {
        let geometry = Geometry::Point(Coord { x: lon, y: lat });
        self.features
            .push(Feature::from_element(geometry, tags, ElementId::node(id)));
    }

    fn way(&mut self, id: u64, geometry: &[RawPoint], tags: Properties) {
        let element = ElementId::way(id);
        let coords: Vec<Coord<f64>> = geometry.iter().map(|point| point.coord()).collect();
        if coords.len() < 2 {
            self.skip(element, "way has fewer than two points");
            return;
        }
        let shape = if is_closed(&coords) {
            if coords.len() < MIN_RING_POINTS {
                self.skip(element, "closed way is too short to form a ring");
                return;
            }
            Geometry::Polygon(vec![orient_ring(RingRole::Outer, coords)])
        } else {
            Geometry::LineString(coords)
        };
        self.features
            .push(Feature::from_element(shape, tags, element));
    }

    fn relation(
        &mut self,
        id: u64,
        tags: Properties,
        members: &[RawMember],
        bounds: Option<RawBounds>,
    ) {
        let element = ElementId::relation(id);
        let outer: Vec<&RawMember> = members
            .iter()
            .filter(|member| member.is_way_with_role("outer"))
            .collect();
        let [single_outer] = outer.as_slice() else {
            // Multipolygons and outer-less relations are not modelled;
            // fall back to a point at the centre of the reported bounds.
            let Some(centre) = bounds.and_then(RawBounds::centre) else {
                self.skip(element, "relation fallback needs a complete bounding box");
                return;
            };
            self.features.push(Feature::from_element(
                Geometry::Point(centre),
                tags,
                element,
            ));
            return;
        };
        let Some(outer_ring) = self.member_ring(element, RingRole::Outer, single_outer) else {
            return;
        };
        let mut rings = vec![outer_ring];
        for member in members
            .iter()
            .filter(|member| member.is_way_with_role("inner"))
        {
            if let Some(ring) = self.member_ring(element, RingRole::Inner, member) {
                rings.push(ring);
            }
        }
        self.features.push(Feature::from_element(
            Geometry::Polygon(rings),
            tags,
            element,
        ));
    }

    fn member_ring(
        &mut self,
        element: ElementId,
        role: RingRole,
        member: &RawMember,
    ) -> Option<Vec<Coord<f64>>> {
        let coords: Vec<Coord<f64>> = member.geometry.iter().map(|point| point.coord()).collect();
        if coords.len() < MIN_RING_POINTS || !is_closed(&coords) {
            self.skip(element, "member ring is unclosed or too short");
            return None;
        }
        Some(orient_ring(role, coords))
    }
}
