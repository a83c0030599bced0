//! Allocations: who receives which share.
//!
//! An `Allocation` is produced once, at the terminal step of a run, and is
//! never mutated afterwards; a new run builds a new one.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Piece;
use crate::tokens::{PlayerId, RegionId};

/// What one player receives.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Share {
    /// One or more spans of the continuous good (several when a procedure
    /// hands out non-adjacent leftovers).
    Segments { pieces: Vec<Piece> },
    /// Discrete items plus a cash compensation (negative = pays in).
    Bundle { items: Vec<RegionId>, cash: f64 },
}

impl Share {
    pub fn piece(p: Piece) -> Self {
        Share::Segments { pieces: vec![p] }
    }

    pub fn segments(pieces: Vec<Piece>) -> Self {
        Share::Segments { pieces }
    }

    /// Total width on the cut axis (0 for bundles).
    pub fn width(&self) -> f64 {
        match self {
            Share::Segments { pieces } => pieces.iter().map(|p| p.width()).sum(),
            Share::Bundle { .. } => 0.0,
        }
    }
}

/// Player → share, plus any part of the good nobody received.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Allocation {
    shares: BTreeMap<PlayerId, Share>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    leftover: Vec<Piece>,
}

impl Allocation {
    pub fn new(shares: BTreeMap<PlayerId, Share>) -> Self {
        Allocation { shares, leftover: Vec::new() }
    }

    pub fn with_leftover(mut self, leftover: Vec<Piece>) -> Self {
        self.leftover = leftover;
        self
    }

    pub fn share(&self, player: &PlayerId) -> Option<&Share> { self.shares.get(player) }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> { self.shares.keys() }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &Share)> { self.shares.iter() }

    pub fn leftover(&self) -> &[Piece] { &self.leftover }

    pub fn len(&self) -> usize { self.shares.len() }

    pub fn is_empty(&self) -> bool { self.shares.is_empty() }
}

impl FromIterator<(PlayerId, Share)> for Allocation {
    fn from_iter<T: IntoIterator<Item = (PlayerId, Share)>>(iter: T) -> Self {
        Allocation::new(iter.into_iter().collect())
    }
}
