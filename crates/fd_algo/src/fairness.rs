//! Fairness analysis over a finished allocation.
//!
//! Contract:
//! - Proportional: every allocated player's own value ≥ total/n − tolerance.
//! - Envy-free: for every ordered pair (p, q), p ≠ q, p's value of q's share
//!   does not exceed p's value of its own share by more than the tolerance.
//! - Equitable: the largest gap between self-assessed values is strictly
//!   below the equitability threshold.
//! - Efficiency: total self-assessed utility as a percentage of n × total;
//!   "efficient" at or above the configured mark (a display heuristic).
//! - Score: mean of the three booleans (0/100) and the efficiency
//!   percentage, the latter capped at 100.
//!
//! Pure: the same inputs always give an identical report.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fd_core::{Allocation, Params, PlayerId};

/// `values[p][q]` = value, to player `p`, of the share assigned to `q`.
pub type ValueMatrix = BTreeMap<PlayerId, BTreeMap<PlayerId, f64>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FairnessError {
    #[error("player count must be positive")]
    NoPlayers,
    #[error("no value for {owner}'s share as seen by {evaluator}")]
    MissingValue { evaluator: PlayerId, owner: PlayerId },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlayerProportionality {
    pub value: f64,
    pub satisfied: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProportionalityCheck {
    pub satisfied: bool,
    /// Effective threshold, tolerance already subtracted.
    pub threshold: f64,
    pub players: BTreeMap<PlayerId, PlayerProportionality>,
}

/// One cell of the envy matrix: how `evaluator` sees `owner`'s share.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvyEntry {
    pub own_value: f64,
    pub other_value: f64,
    /// `other_value − own_value`.
    pub difference: f64,
    pub envies: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvyViolation {
    pub evaluator: PlayerId,
    pub owner: PlayerId,
    pub difference: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvyCheck {
    pub satisfied: bool,
    /// evaluator → owner → entry (diagonal omitted).
    pub matrix: BTreeMap<PlayerId, BTreeMap<PlayerId, EnvyEntry>>,
    pub violations: Vec<EnvyViolation>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EquitabilityCheck {
    pub satisfied: bool,
    pub max_difference: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EfficiencyCheck {
    pub total_utility: f64,
    pub max_utility: f64,
    pub percent: f64,
    pub efficient: bool,
}

/// Read-only verdict over one allocation. Recompute rather than mutate.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FairnessReport {
    pub player_count: usize,
    pub proportional: ProportionalityCheck,
    pub envy_free: EnvyCheck,
    pub equitable: EquitabilityCheck,
    pub efficiency: EfficiencyCheck,
    pub score: f64,
}

fn lookup(values: &ValueMatrix, evaluator: &PlayerId, owner: &PlayerId) -> Result<f64, FairnessError> {
    values
        .get(evaluator)
        .and_then(|row| row.get(owner))
        .copied()
        .ok_or_else(|| FairnessError::MissingValue {
            evaluator: evaluator.clone(),
            owner: owner.clone(),
        })
}

/// Analyze `allocation` given every player's view of every share.
pub fn analyze_fairness(
    allocation: &Allocation,
    values: &ValueMatrix,
    player_count: usize,
    params: &Params,
) -> Result<FairnessReport, FairnessError> {
    if player_count == 0 {
        return Err(FairnessError::NoPlayers);
    }
    let players: Vec<&PlayerId> = allocation.players().collect();

    let mut own = BTreeMap::new();
    for p in &players {
        own.insert((*p).clone(), lookup(values, p, p)?);
    }

    // Proportional
    let threshold = params.valuation_total / player_count as f64 - params.proportional_tolerance;
    let prop_players: BTreeMap<PlayerId, PlayerProportionality> = own
        .iter()
        .map(|(p, &value)| (p.clone(), PlayerProportionality { value, satisfied: value >= threshold }))
        .collect();
    let proportional = ProportionalityCheck {
        satisfied: prop_players.values().all(|e| e.satisfied),
        threshold,
        players: prop_players,
    };

    // Envy-free
    let mut matrix: BTreeMap<PlayerId, BTreeMap<PlayerId, EnvyEntry>> = BTreeMap::new();
    let mut violations = Vec::new();
    for p in &players {
        let own_value = own[*p];
        let row = matrix.entry((*p).clone()).or_default();
        for q in &players {
            if p == q {
                continue;
            }
            let other_value = lookup(values, p, q)?;
            let difference = other_value - own_value;
            let envies = other_value > own_value + params.envy_tolerance;
            if envies {
                violations.push(EnvyViolation {
                    evaluator: (*p).clone(),
                    owner: (*q).clone(),
                    difference,
                });
            }
            row.insert((*q).clone(), EnvyEntry { own_value, other_value, difference, envies });
        }
    }
    let envy_free = EnvyCheck { satisfied: violations.is_empty(), matrix, violations };

    // Equitable: max pairwise |a − b| is max − min.
    let max_difference = match (
        own.values().copied().reduce(f64::max),
        own.values().copied().reduce(f64::min),
    ) {
        (Some(hi), Some(lo)) => hi - lo,
        _ => 0.0,
    };
    let equitable = EquitabilityCheck {
        satisfied: max_difference < params.equitability_threshold,
        max_difference,
    };

    // Efficiency
    let total_utility: f64 = own.values().sum();
    let max_utility = player_count as f64 * params.valuation_total;
    let percent = total_utility / max_utility * 100.0;
    let efficiency = EfficiencyCheck {
        total_utility,
        max_utility,
        percent,
        efficient: percent >= params.efficiency_threshold_pct,
    };

    let flag = |b: bool| if b { 100.0 } else { 0.0 };
    let score = (flag(proportional.satisfied)
        + flag(envy_free.satisfied)
        + flag(equitable.satisfied)
        + percent.clamp(0.0, 100.0))
        / 4.0;

    Ok(FairnessReport { player_count, proportional, envy_free, equitable, efficiency, score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::{Share, Span};

    fn pid(s: &str) -> PlayerId { s.parse().unwrap() }

    fn alloc(players: &[&str]) -> Allocation {
        players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let start = i as f64 * 100.0;
                (pid(p), Share::piece(Span { start, end: start + 100.0 }))
            })
            .collect()
    }

    fn matrix(rows: &[(&str, &[(&str, f64)])]) -> ValueMatrix {
        rows.iter()
            .map(|(p, cells)| (pid(p), cells.iter().map(|(q, v)| (pid(q), *v)).collect()))
            .collect()
    }

    #[test]
    fn proportional_threshold_for_three_players() {
        let a = alloc(&["P1", "P2", "P3"]);
        let m = matrix(&[
            ("P1", &[("P1", 40.0), ("P2", 30.0), ("P3", 30.0)]),
            ("P2", &[("P1", 30.0), ("P2", 40.0), ("P3", 30.0)]),
            ("P3", &[("P1", 40.0), ("P2", 30.0), ("P3", 30.0)]),
        ]);
        let r = analyze_fairness(&a, &m, 3, &Params::default()).unwrap();
        assert!((r.proportional.threshold - (100.0 / 3.0 - 0.1)).abs() < 1e-12);
        assert!(r.proportional.players[&pid("P1")].satisfied);
        assert!(r.proportional.players[&pid("P2")].satisfied);
        // P3 holds 30 < 33.23.
        assert!(!r.proportional.players[&pid("P3")].satisfied);
        assert!(!r.proportional.satisfied);
    }

    #[test]
    fn envy_is_recorded_with_gap() {
        let a = alloc(&["A", "B"]);
        let m = matrix(&[
            ("A", &[("A", 30.0), ("B", 45.0)]),
            ("B", &[("A", 40.0), ("B", 60.0)]),
        ]);
        let r = analyze_fairness(&a, &m, 2, &Params::default()).unwrap();
        assert!(!r.envy_free.satisfied);
        let cell = &r.envy_free.matrix[&pid("A")][&pid("B")];
        assert!(cell.envies);
        assert_eq!(cell.difference, 15.0);
        assert!(!r.envy_free.matrix[&pid("B")][&pid("A")].envies);
        assert_eq!(r.envy_free.violations.len(), 1);
    }

    #[test]
    fn envy_within_tolerance_is_ignored() {
        let a = alloc(&["A", "B"]);
        let m = matrix(&[
            ("A", &[("A", 50.0), ("B", 50.05)]),
            ("B", &[("A", 49.95), ("B", 50.05)]),
        ]);
        let r = analyze_fairness(&a, &m, 2, &Params::default()).unwrap();
        assert!(r.envy_free.satisfied);
        assert!(r.equitable.satisfied);
    }

    #[test]
    fn equitability_is_strict() {
        let a = alloc(&["A", "B"]);
        let m = matrix(&[
            ("A", &[("A", 51.0), ("B", 49.0)]),
            ("B", &[("A", 48.0), ("B", 52.0)]),
        ]);
        let r = analyze_fairness(&a, &m, 2, &Params::default()).unwrap();
        assert_eq!(r.equitable.max_difference, 1.0);
        assert!(!r.equitable.satisfied);
    }

    #[test]
    fn score_uses_raw_efficiency() {
        let a = alloc(&["A", "B"]);
        let m = matrix(&[
            ("A", &[("A", 50.0), ("B", 50.0)]),
            ("B", &[("A", 50.0), ("B", 50.0)]),
        ]);
        let r = analyze_fairness(&a, &m, 2, &Params::default()).unwrap();
        assert_eq!(r.efficiency.percent, 50.0);
        assert!(!r.efficiency.efficient);
        assert_eq!(r.score, (100.0 + 100.0 + 100.0 + 50.0) / 4.0);
    }

    #[test]
    fn missing_cells_are_reported() {
        let a = alloc(&["A", "B"]);
        let m = matrix(&[("A", &[("A", 50.0)])]);
        assert_eq!(
            analyze_fairness(&a, &m, 2, &Params::default()),
            Err(FairnessError::MissingValue { evaluator: pid("A"), owner: pid("B") })
        );
        assert_eq!(analyze_fairness(&a, &m, 0, &Params::default()), Err(FairnessError::NoPlayers));
    }
}
