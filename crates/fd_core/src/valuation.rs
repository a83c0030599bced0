//! Player valuations: points per region.
//!
//! Every player's points add up to a fixed total (`Params::valuation_total`,
//! 100 by default). The check lives in the pipeline's input validation; this
//! type only stores the table.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tokens::{PlayerId, RegionId};

/// One player's point table. Regions absent from the table are worth 0.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Valuation {
    points: BTreeMap<RegionId, f64>,
}

/// All players' valuations for a session.
pub type Valuations = BTreeMap<PlayerId, Valuation>;

impl Valuation {
    pub fn new() -> Self { Self::default() }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (RegionId, f64)>,
    {
        Valuation { points: points.into_iter().collect() }
    }

    /// Set (or replace) the points for one region.
    pub fn set(&mut self, region: RegionId, points: f64) {
        self.points.insert(region, points);
    }

    /// Points for `region`; 0 when the region is absent.
    pub fn get(&self, region: &RegionId) -> f64 {
        self.points.get(region).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.points.values().sum()
    }

    /// Every value multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Valuation { points: self.points.iter().map(|(r, v)| (r.clone(), v * k)).collect() }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, f64)> {
        self.points.iter().map(|(r, v)| (r, *v))
    }

    pub fn len(&self) -> usize { self.points.len() }

    pub fn is_empty(&self) -> bool { self.points.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_region_is_worth_zero() {
        let v = Valuation::from_points([("blue".parse().unwrap(), 20.0)]);
        assert_eq!(v.get(&"red".parse().unwrap()), 0.0);
        assert_eq!(v.total(), 20.0);
        assert_eq!(v.scaled(2.0).total(), 40.0);
    }
}
