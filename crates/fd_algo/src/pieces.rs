//! Cuts → pieces.

use fd_core::{Cut, GeometryError, Piece, Span};

/// Checks and sorts cut positions ascending.
pub fn sorted_cuts(cuts: &[Cut], axis_length: f64) -> Result<Vec<Cut>, GeometryError> {
    if !(axis_length.is_finite() && axis_length > 0.0) {
        return Err(GeometryError::InvalidAxis(axis_length));
    }
    let mut out = Vec::with_capacity(cuts.len());
    for &c in cuts {
        if !c.is_finite() {
            return Err(GeometryError::NonFinite { what: "cut", value: c });
        }
        if c < 0.0 || c > axis_length {
            return Err(GeometryError::CutOutOfRange { cut: c, axis_length });
        }
        out.push(c);
    }
    out.sort_by(|a, b| a.total_cmp(b));
    Ok(out)
}

/// Split `[0, axis_length]` at the given cuts.
///
/// Always yields `cuts.len() + 1` consecutive pieces. Duplicate cut positions
/// yield zero-width pieces; that is intended, not an error.
pub fn cut_to_pieces(cuts: &[Cut], axis_length: f64) -> Result<Vec<Piece>, GeometryError> {
    let sorted = sorted_cuts(cuts, axis_length)?;

    let mut pieces = Vec::with_capacity(sorted.len() + 1);
    let mut start = 0.0;
    for c in sorted {
        pieces.push(Span { start, end: c });
        start = c;
    }
    pieces.push(Span { start, end: axis_length });
    Ok(pieces)
}
