//! Region overlap: what share of each region lies inside a piece.
//!
//! A piece is a band through the whole good, so only the region's extent on
//! the cut axis matters. Percentages are in `[0, 100]`.

use std::collections::BTreeMap;

use fd_core::{GeometryError, Piece, Rect, Region, RegionId, RegionSet};

/// Region → overlap percentage for one piece, keyed by region id.
/// Totals across regions are unconstrained.
pub type RegionDistribution = BTreeMap<RegionId, f64>;

/// Fraction (as a percentage) of `region` that lies inside `piece`.
///
/// Returns 0 when the two do not overlap or only touch. Bounds are checked
/// first: the region must have positive extent, the piece a non-negative one.
pub fn region_overlap_percent(piece: &Piece, region: &Region) -> Result<f64, GeometryError> {
    piece.check_piece()?;
    region.shape.check()?;

    let extent = region.shape.axis_extent();
    let pct = match piece.intersect(&extent) {
        Some(inside) => inside.width() / extent.width() * 100.0,
        None => 0.0,
    };
    Ok(pct.clamp(0.0, 100.0))
}

/// Area percentage of `region` covered by the rectangle `piece`.
pub fn rect_overlap_percent(piece: &Rect, region: &Rect) -> Result<f64, GeometryError> {
    piece.check()?;
    region.check()?;
    let pct = piece.intersection_area(region) / region.area() * 100.0;
    Ok(pct.clamp(0.0, 100.0))
}

/// Applies [`region_overlap_percent`] to every region of the set.
pub fn region_distribution(piece: &Piece, regions: &RegionSet) -> Result<RegionDistribution, GeometryError> {
    let mut dist = RegionDistribution::new();
    for region in regions.iter() {
        dist.insert(region.id.clone(), region_overlap_percent(piece, region)?);
    }
    Ok(dist)
}
