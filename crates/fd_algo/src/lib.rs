// crates/fd_algo/src/lib.rs
//! fd_algo: pure geometry/valuation math and fairness predicates.
//!
//! No I/O, no clocks. Everything here is a function of its arguments, apart
//! from the optional memoization cache owned by [`CalculationEngine`].
//! Malformed geometry fails fast with a `GeometryError`; nothing is retried
//! and nothing is caught here.

#![forbid(unsafe_code)]

use fd_core::{GeometryError, PlayerId};

pub mod overlap;
pub mod pieces;
pub mod value;
pub mod fairness;
pub mod cache;
pub mod engine;

pub use overlap::{rect_overlap_percent, region_distribution, region_overlap_percent, RegionDistribution};
pub use pieces::{cut_to_pieces, sorted_cuts};
pub use value::{
    piece_value, player_value, segments_value, share_value, split_point, split_segments, SplitPoint,
};
pub use fairness::{
    analyze_fairness, EfficiencyCheck, EnvyCheck, EnvyEntry, EnvyViolation, EquitabilityCheck,
    FairnessError, FairnessReport, PlayerProportionality, ProportionalityCheck, ValueMatrix,
};
pub use cache::{CacheStats, CalcCache};
pub use engine::CalculationEngine;

/// Error surface of the engine as seen by callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("fairness: {0}")]
    Fairness(#[from] FairnessError),
    #[error("no valuation for player {0}")]
    MissingValuation(PlayerId),
}
