//! Overpass QL query construction.

use layercast_core::{ConfigurationError, LayerCatalog, RegionCatalog};

/// Server-side evaluation budget requested from Overpass, in seconds.
const SERVER_TIMEOUT_SECS: u32 = 25;

/// Build the Overpass QL query for one (layer, region) pair.
///
/// The query requests JSON output with full geometry for every node, way,
/// and relation matching the layer's tag filter inside the region's
/// bounding box. Pure and deterministic.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] when the layer or region is not present
/// in the supplied catalogs.
///
/// # Examples
/// ```
/// use layercast_core::{LayerCatalog, RegionCatalog};
/// use layercast_overpass::build_query;
///
/// # fn main() -> Result<(), layercast_core::ConfigurationError> {
/// let query = build_query(
///     &LayerCatalog::builtin(),
///     &RegionCatalog::builtin(),
///     "castles",
///     "CH",
/// )?;
/// assert_eq!(
///     query,
///     "[out:json][timeout:25];nwr[historic=castle](45.6,5.4,47.99,11.2);out geom;"
/// );
/// # Ok(())
/// # }
/// ```
pub fn build_query(
    layers: &LayerCatalog,
    regions: &RegionCatalog,
    layer: &str,
    region: &str,
) -> Result<String, ConfigurationError> {
    let filter = layers.require(layer)?;
    let bounds = regions.require(region)?;
    Ok(format!(
        "[out:json][timeout:{SERVER_TIMEOUT_SECS}];nwr[{filter}]({},{},{},{});out geom;",
        bounds.south(),
        bounds.west(),
        bounds.north(),
        bounds.east(),
    ))
}
