//! Geometry of the divisible good.
//!
//! The good lies along a single cut axis `[0, axis_length]`. Regions are
//! fixed sub-intervals (or rectangles, for 2-D demos) that carry per-player
//! point values; pieces are contiguous spans on the cut axis. A piece spans
//! the whole height of the good, so it meets a rectangle as a vertical band.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;
use crate::tokens::RegionId;

/// A scalar cut position along the axis.
pub type Cut = f64;

/// Contiguous interval `[start, end]` on the cut axis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

/// A piece is a span produced by cutting; zero width is allowed.
pub type Piece = Span;

fn finite(what: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() { Ok(value) } else { Err(GeometryError::NonFinite { what, value }) }
}

impl Span {
    /// Piece constructor: `start <= end`, both finite. Zero width is legal.
    pub fn new(start: f64, end: f64) -> Result<Self, GeometryError> {
        let s = Span { start, end };
        s.check_piece()?;
        Ok(s)
    }

    /// Region constructor: strictly positive width.
    pub fn region(start: f64, end: f64) -> Result<Self, GeometryError> {
        let s = Span { start, end };
        s.check_region()?;
        Ok(s)
    }

    #[inline]
    pub fn width(&self) -> f64 { self.end - self.start }

    #[inline]
    pub fn is_empty(&self) -> bool { self.width() <= 0.0 }

    #[inline]
    pub fn contains(&self, x: f64) -> bool { x >= self.start && x <= self.end }

    /// Intersection with positive width, or `None` (disjoint or touching).
    pub fn intersect(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end > start { Some(Span { start, end }) } else { None }
    }

    pub fn check_piece(&self) -> Result<(), GeometryError> {
        finite("piece start", self.start)?;
        finite("piece end", self.end)?;
        if self.end < self.start {
            return Err(GeometryError::NegativePiece { start: self.start, end: self.end });
        }
        Ok(())
    }

    pub fn check_region(&self) -> Result<(), GeometryError> {
        finite("region start", self.start)?;
        finite("region end", self.end)?;
        if self.end <= self.start {
            return Err(GeometryError::EmptyRegion { start: self.start, end: self.end });
        }
        Ok(())
    }
}

/// Axis-aligned rectangle in canvas space (`x` runs along the cut axis).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        let r = Rect { x, y, width, height };
        r.check()?;
        Ok(r)
    }

    pub fn check(&self) -> Result<(), GeometryError> {
        finite("rect x", self.x)?;
        finite("rect y", self.y)?;
        finite("rect width", self.width)?;
        finite("rect height", self.height)?;
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(GeometryError::EmptyRect { width: self.width, height: self.height });
        }
        Ok(())
    }

    #[inline]
    pub fn area(&self) -> f64 { self.width * self.height }

    /// Horizontal extent on the cut axis.
    #[inline]
    pub fn x_span(&self) -> Span { Span { start: self.x, end: self.x + self.width } }

    #[inline]
    pub fn y_span(&self) -> Span { Span { start: self.y, end: self.y + self.height } }

    /// Area of the intersection (0 when disjoint or touching).
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        match (self.x_span().intersect(&other.x_span()), self.y_span().intersect(&other.y_span())) {
            (Some(xs), Some(ys)) => xs.width() * ys.width(),
            _ => 0.0,
        }
    }
}

/// Region shape: an interval on the cut axis or a rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Shape {
    Span(Span),
    Rect(Rect),
}

impl Shape {
    /// Extent of the shape projected on the cut axis.
    pub fn axis_extent(&self) -> Span {
        match self {
            Shape::Span(s) => *s,
            Shape::Rect(r) => r.x_span(),
        }
    }

    pub fn check(&self) -> Result<(), GeometryError> {
        match self {
            Shape::Span(s) => s.check_region(),
            Shape::Rect(r) => r.check(),
        }
    }
}

/// A named, immutable part of the good.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub id: RegionId,
    pub shape: Shape,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub label: Option<String>,
}

impl Region {
    pub fn new(id: RegionId, shape: Shape) -> Result<Self, GeometryError> {
        shape.check()?;
        Ok(Region { id, shape, label: None })
    }

    pub fn span(id: RegionId, start: f64, end: f64) -> Result<Self, GeometryError> {
        Ok(Region { id, shape: Shape::Span(Span::region(start, end)?), label: None })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Validated region list; declaration order is preserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    /// Checks every shape and rejects duplicate ids.
    pub fn new(regions: Vec<Region>) -> Result<Self, GeometryError> {
        let mut seen = BTreeSet::new();
        for r in &regions {
            r.shape.check()?;
            if !seen.insert(r.id.clone()) {
                return Err(GeometryError::DuplicateRegion(r.id.to_string()));
            }
        }
        Ok(RegionSet { regions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> { self.regions.iter() }

    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RegionId) -> bool { self.get(id).is_some() }

    pub fn ids(&self) -> impl Iterator<Item = &RegionId> { self.regions.iter().map(|r| &r.id) }

    pub fn len(&self) -> usize { self.regions.len() }

    pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    pub fn as_slice(&self) -> &[Region] { &self.regions }
}
