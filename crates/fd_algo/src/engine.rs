//! `CalculationEngine`: the region set, the tunables and the cache in one
//! place. Same math as the free functions, with distributions memoized.

use std::collections::BTreeMap;

use fd_core::{Allocation, Cut, GeometryError, Params, Piece, RegionSet, Share, Valuation, Valuations};

use crate::cache::{CacheStats, CalcCache};
use crate::fairness::{analyze_fairness, FairnessReport, ValueMatrix};
use crate::overlap::{region_distribution, RegionDistribution};
use crate::pieces::cut_to_pieces;
use crate::value::{player_value, share_value};
use crate::CalcError;

#[derive(Debug)]
pub struct CalculationEngine {
    regions: RegionSet,
    params: Params,
    cache: CalcCache,
}

impl CalculationEngine {
    pub fn new(regions: RegionSet, params: Params) -> Self {
        let cache = CalcCache::new(params.cache_capacity);
        CalculationEngine { regions, params, cache }
    }

    pub fn regions(&self) -> &RegionSet { &self.regions }

    pub fn params(&self) -> &Params { &self.params }

    /// Replaces the region set; cached distributions no longer apply.
    pub fn set_regions(&mut self, regions: RegionSet) {
        self.regions = regions;
        self.cache.clear();
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats { self.cache.stats() }

    /// Pieces for `cuts` on this engine's axis.
    pub fn cut_to_pieces(&self, cuts: &[Cut]) -> Result<Vec<Piece>, GeometryError> {
        cut_to_pieces(cuts, self.params.axis_length)
    }

    /// Memoized [`region_distribution`].
    pub fn distribution(&mut self, piece: &Piece) -> Result<RegionDistribution, GeometryError> {
        piece.check_piece()?;
        if let Some(hit) = self.cache.get(piece) {
            return Ok(hit);
        }
        let dist = region_distribution(piece, &self.regions)?;
        self.cache.set(piece, dist.clone());
        Ok(dist)
    }

    pub fn piece_value(&mut self, piece: &Piece, valuation: &Valuation) -> Result<f64, GeometryError> {
        Ok(player_value(&self.distribution(piece)?, valuation))
    }

    pub fn share_value(&mut self, share: &Share, valuation: &Valuation) -> Result<f64, GeometryError> {
        match share {
            Share::Segments { pieces } => {
                let mut total = 0.0;
                for p in pieces {
                    total += self.piece_value(p, valuation)?;
                }
                Ok(total)
            }
            Share::Bundle { .. } => share_value(share, &self.regions, valuation),
        }
    }

    /// Every allocated player's value of every allocated share.
    pub fn value_matrix(&mut self, allocation: &Allocation, valuations: &Valuations) -> Result<ValueMatrix, CalcError> {
        let mut matrix = ValueMatrix::new();
        for evaluator in allocation.players() {
            let valuation = valuations
                .get(evaluator)
                .ok_or_else(|| CalcError::MissingValuation(evaluator.clone()))?;
            let mut row = BTreeMap::new();
            for (owner, share) in allocation.iter() {
                row.insert(owner.clone(), self.share_value(share, valuation)?);
            }
            matrix.insert(evaluator.clone(), row);
        }
        Ok(matrix)
    }

    /// Value matrix + [`analyze_fairness`] with this engine's tunables.
    pub fn analyze(
        &mut self,
        allocation: &Allocation,
        valuations: &Valuations,
        player_count: usize,
    ) -> Result<FairnessReport, CalcError> {
        let matrix = self.value_matrix(allocation, valuations)?;
        Ok(analyze_fairness(allocation, &matrix, player_count, &self.params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::{PlayerId, Region, RegionId, Span};

    fn rid(s: &str) -> RegionId { s.parse().unwrap() }

    #[test]
    fn repeated_distribution_hits_cache() {
        let regions = RegionSet::new(vec![Region::span(rid("a"), 0.0, 800.0).unwrap()]).unwrap();
        let mut e = CalculationEngine::new(regions, Params::default());
        let p = Span { start: 0.0, end: 400.0 };
        let first = e.distribution(&p).unwrap();
        let second = e.distribution(&p).unwrap();
        assert_eq!(first, second);
        assert_eq!(e.cache_stats().hits, 1);
        e.invalidate();
        assert_eq!(e.cache_stats().len, 0);
    }

    #[test]
    fn value_matrix_needs_every_valuation() {
        let regions = RegionSet::new(vec![Region::span(rid("a"), 0.0, 800.0).unwrap()]).unwrap();
        let mut e = CalculationEngine::new(regions, Params::default());
        let p1 = PlayerId::numbered(1);
        let alloc: Allocation = [(p1.clone(), Share::piece(Span { start: 0.0, end: 800.0 }))].into_iter().collect();
        let err = e.value_matrix(&alloc, &Valuations::new()).unwrap_err();
        assert_eq!(err, CalcError::MissingValuation(p1));
    }
}
