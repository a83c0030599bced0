//! variables.rs: engine tunables with named defaults.
//!
//! The tolerances are part of the observable contract: fairness verdicts
//! depend on them, so they are kept as named values rather than inlined.
//! The 90 % efficiency mark and the 1.0 equitability gap have no derivation
//! behind them; they are display heuristics and stay configurable.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Slack for "value ≥ 1/n" checks.
pub const PROPORTIONAL_TOLERANCE: f64 = 0.1;
/// Slack for "own ≥ other" checks.
pub const ENVY_TOLERANCE: f64 = 0.1;
/// Equitable iff the largest self-assessed gap is strictly below this.
pub const EQUITABILITY_THRESHOLD: f64 = 1.0;
/// Efficiency percentage at or above which an allocation is flagged efficient.
pub const EFFICIENCY_THRESHOLD_PCT: f64 = 90.0;
/// Every valuation must add up to this many points.
pub const VALUATION_TOTAL: f64 = 100.0;
/// Slack for the valuation-total check in standard input validation.
pub const VALUATION_TOLERANCE: f64 = 0.1;
/// Canvas width used by the demos.
pub const DEFAULT_AXIS_LENGTH: f64 = 800.0;
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
/// Pacing delay for auto-advancing phases.
pub const AUTO_ADVANCE_DELAY_MS: u64 = 1500;

/// Typed parameter set. Every field has a default, so a partial `params`
/// block in a scenario file is enough.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Params {
    pub proportional_tolerance: f64,
    pub envy_tolerance: f64,
    pub equitability_threshold: f64,
    pub efficiency_threshold_pct: f64,
    pub valuation_total: f64,
    pub valuation_tolerance: f64,
    pub axis_length: f64,
    pub cache_capacity: usize,
    pub auto_advance_delay_ms: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            proportional_tolerance: PROPORTIONAL_TOLERANCE,
            envy_tolerance: ENVY_TOLERANCE,
            equitability_threshold: EQUITABILITY_THRESHOLD,
            efficiency_threshold_pct: EFFICIENCY_THRESHOLD_PCT,
            valuation_total: VALUATION_TOTAL,
            valuation_tolerance: VALUATION_TOLERANCE,
            axis_length: DEFAULT_AXIS_LENGTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            auto_advance_delay_ms: AUTO_ADVANCE_DELAY_MS,
        }
    }
}

fn non_negative(v: f64, name: &'static str) -> Result<(), CoreError> {
    if v.is_finite() && v >= 0.0 { Ok(()) } else { Err(CoreError::DomainOutOfRange(name)) }
}

/// Domain checks for a parameter set.
pub fn validate_domains(p: &Params) -> Result<(), CoreError> {
    non_negative(p.proportional_tolerance, "proportional_tolerance")?;
    non_negative(p.envy_tolerance, "envy_tolerance")?;
    non_negative(p.equitability_threshold, "equitability_threshold")?;
    non_negative(p.valuation_tolerance, "valuation_tolerance")?;
    if !(p.efficiency_threshold_pct.is_finite() && (0.0..=100.0).contains(&p.efficiency_threshold_pct)) {
        return Err(CoreError::DomainOutOfRange("efficiency_threshold_pct"));
    }
    if !(p.valuation_total.is_finite() && p.valuation_total > 0.0) {
        return Err(CoreError::DomainOutOfRange("valuation_total"));
    }
    if !(p.axis_length.is_finite() && p.axis_length > 0.0) {
        return Err(CoreError::DomainOutOfRange("axis_length"));
    }
    if p.cache_capacity == 0 {
        return Err(CoreError::DomainOutOfRange("cache_capacity"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_domain_checks() {
        assert_eq!(validate_domains(&Params::default()), Ok(()));
    }

    #[test]
    fn rejects_bad_axis_and_cache() {
        let p = Params { axis_length: 0.0, ..Params::default() };
        assert_eq!(validate_domains(&p), Err(CoreError::DomainOutOfRange("axis_length")));
        let p = Params { cache_capacity: 0, ..Params::default() };
        assert_eq!(validate_domains(&p), Err(CoreError::DomainOutOfRange("cache_capacity")));
        let p = Params { envy_tolerance: f64::NAN, ..Params::default() };
        assert_eq!(validate_domains(&p), Err(CoreError::DomainOutOfRange("envy_tolerance")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_params_fill_defaults() {
        let p: Params = serde_json::from_str(r#"{"axis_length": 400.0}"#).unwrap();
        assert_eq!(p.axis_length, 400.0);
        assert_eq!(p.envy_tolerance, ENVY_TOLERANCE);
    }
}
