//! Winding-order rules for polygon rings.
//!
//! GeoJSON follows the right-hand rule: exterior rings are counter-clockwise,
//! holes are clockwise. Overpass makes no such promise, so every ring is
//! oriented here before it enters a [`crate::Geometry::Polygon`].

use geo::Coord;

/// The role a ring plays inside a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    /// The exterior boundary.
    Outer,
    /// A hole boundary.
    Inner,
}

/// Whether the ring starts and ends at exactly the same coordinate.
#[must_use]
pub fn is_closed(ring: &[Coord<f64>]) -> bool {
    if ring.len() < 2 {
        return false;
    }
    ring.first() == ring.last()
}

/// Shoelace sum `Σ (x₂ − x₁)(y₂ + y₁)` over consecutive ring points.
///
/// Negative for counter-clockwise rings in the x-right/y-up frame used by
/// GeoJSON coordinates.
#[must_use]
pub fn shoelace_sum(ring: &[Coord<f64>]) -> f64 {
    ring.windows(2)
        .map(|pair| match pair {
            [p, q] => (q.x - p.x) * (q.y + p.y),
            _ => 0.0,
        })
        .sum()
}

/// Reverse the ring's point order when its winding does not match `role`.
///
/// Outer rings want a shoelace sum of at most zero, inner rings the
/// opposite. The ring must be closed; applying the fix twice is a no-op.
#[must_use]
pub fn orient_ring(role: RingRole, mut ring: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    debug_assert!(is_closed(&ring), "ring must be closed");
    let total = shoelace_sum(&ring);
    let reverse = match role {
        RingRole::Outer => total > 0.0,
        RingRole::Inner => total <= 0.0,
    };
    if reverse {
        ring.reverse();
    }
    ring
}
