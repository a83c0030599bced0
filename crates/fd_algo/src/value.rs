//! Player valuation of pieces and shares, plus the bisection used to find
//! "worth exactly X to me" positions.
//!
//! Values are not normalized: every valuation adds up to the same total, so
//! numbers are directly comparable across players.

use fd_core::{GeometryError, Piece, RegionSet, Share, Span, Valuation};

use crate::overlap::{region_distribution, RegionDistribution};

/// Bisection rounds for [`split_point`]; 64 halvings exhaust f64 precision
/// on any realistic axis.
const BISECTION_STEPS: u32 = 64;

/// Dot product of overlap fractions (percent / 100) and region points.
pub fn player_value(distribution: &RegionDistribution, valuation: &Valuation) -> f64 {
    distribution
        .iter()
        .map(|(region, pct)| pct / 100.0 * valuation.get(region))
        .sum()
}

/// Value of one piece to the holder of `valuation` (uncached).
pub fn piece_value(piece: &Piece, regions: &RegionSet, valuation: &Valuation) -> Result<f64, GeometryError> {
    Ok(player_value(&region_distribution(piece, regions)?, valuation))
}

/// Sum of piece values over a list of segments.
pub fn segments_value(segments: &[Piece], regions: &RegionSet, valuation: &Valuation) -> Result<f64, GeometryError> {
    let mut total = 0.0;
    for p in segments {
        total += piece_value(p, regions, valuation)?;
    }
    Ok(total)
}

/// Value of a share: segments by overlap, bundles by item points plus cash.
pub fn share_value(share: &Share, regions: &RegionSet, valuation: &Valuation) -> Result<f64, GeometryError> {
    match share {
        Share::Segments { pieces } => segments_value(pieces, regions, valuation),
        Share::Bundle { items, cash } => {
            let mut total = *cash;
            for item in items {
                if !regions.contains(item) {
                    return Err(GeometryError::UnknownRegion(item.to_string()));
                }
                total += valuation.get(item);
            }
            Ok(total)
        }
    }
}

/// Position found by [`split_point`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitPoint {
    /// Distance from the start of the segment list, counted along the
    /// concatenated segments.
    pub offset: f64,
    /// The same point as an axis coordinate.
    pub position: f64,
}

/// Split a segment list at `offset` (measured along the concatenation).
/// Zero-width fragments are dropped on both sides.
pub fn split_segments(segments: &[Piece], offset: f64) -> (Vec<Piece>, Vec<Piece>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut remaining = offset.max(0.0);

    for seg in segments {
        let w = seg.width();
        if remaining >= w {
            if w > 0.0 { left.push(*seg); }
            remaining -= w;
        } else if remaining > 0.0 {
            let mid = seg.start + remaining;
            left.push(Span { start: seg.start, end: mid });
            right.push(Span { start: mid, end: seg.end });
            remaining = 0.0;
        } else if w > 0.0 {
            right.push(*seg);
        }
    }
    (left, right)
}

fn position_at(segments: &[Piece], offset: f64) -> f64 {
    let mut remaining = offset.max(0.0);
    let mut last = 0.0;
    for seg in segments {
        let w = seg.width();
        if remaining <= w {
            return seg.start + remaining;
        }
        remaining -= w;
        last = seg.end;
    }
    last
}

/// Smallest offset along `segments` whose prefix is worth at least `target`
/// to the holder of `valuation`.
///
/// Prefix value is non-decreasing in the offset, so bisection converges.
/// Targets at or below 0 resolve to the start; targets at or above the
/// whole list's value resolve to the end.
pub fn split_point(
    segments: &[Piece],
    regions: &RegionSet,
    valuation: &Valuation,
    target: f64,
) -> Result<SplitPoint, GeometryError> {
    for seg in segments {
        seg.check_piece()?;
    }
    let total_len: f64 = segments.iter().map(|s| s.width()).sum();
    let at = |offset: f64| SplitPoint { offset, position: position_at(segments, offset) };

    if total_len <= 0.0 || target <= 0.0 {
        return Ok(at(0.0));
    }
    if target >= segments_value(segments, regions, valuation)? {
        return Ok(at(total_len));
    }

    let (mut lo, mut hi) = (0.0_f64, total_len);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        let (prefix, _) = split_segments(segments, mid);
        if segments_value(&prefix, regions, valuation)? < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(at(hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::{Region, RegionId};

    fn rid(s: &str) -> RegionId { s.parse().unwrap() }

    fn two_halves() -> (RegionSet, Valuation) {
        let regions = RegionSet::new(vec![
            Region::span(rid("a"), 0.0, 400.0).unwrap(),
            Region::span(rid("b"), 400.0, 800.0).unwrap(),
        ])
        .unwrap();
        let v = Valuation::from_points([(rid("a"), 80.0), (rid("b"), 20.0)]);
        (regions, v)
    }

    #[test]
    fn split_point_finds_half_value() {
        let (regions, v) = two_halves();
        let whole = [Span { start: 0.0, end: 800.0 }];
        let sp = split_point(&whole, &regions, &v, 50.0).unwrap();
        // 50 of the 80 points in [0,400] → 250 px.
        assert!((sp.position - 250.0).abs() < 1e-6);
    }

    #[test]
    fn split_across_gap() {
        let segs = [Span { start: 0.0, end: 100.0 }, Span { start: 300.0, end: 400.0 }];
        let (l, r) = split_segments(&segs, 150.0);
        assert_eq!(l, vec![Span { start: 0.0, end: 100.0 }, Span { start: 300.0, end: 350.0 }]);
        assert_eq!(r, vec![Span { start: 350.0, end: 400.0 }]);
        assert_eq!(position_at(&segs, 150.0), 350.0);
    }

    #[test]
    fn bundle_value_adds_cash() {
        let (regions, v) = two_halves();
        let share = Share::Bundle { items: vec![rid("a")], cash: -5.0 };
        assert_eq!(share_value(&share, &regions, &v).unwrap(), 75.0);

        let bad = Share::Bundle { items: vec![rid("zzz")], cash: 0.0 };
        assert!(matches!(share_value(&bad, &regions, &v), Err(GeometryError::UnknownRegion(_))));
    }
}
