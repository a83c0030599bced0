//! crates/fd_pipeline/src/operation.rs
//! Player operations and how they change the per-run data.
//!
//! Operations come from two places: the presentation layer (a human
//! acting) and autoplay effects queued by step actions. Both go through
//! [`apply`]; gating by the active step happens in the machine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use fd_algo::{segments_value, sorted_cuts, split_point, CalculationEngine};
use fd_core::{Cut, Piece, PlayerId, Share, Span};

use crate::machine::{RunState, StepError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Cut,
    Select,
    Accept,
    Mark,
    Stop,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Cut => "cut",
            OperationKind::Select => "select",
            OperationKind::Accept => "accept",
            OperationKind::Mark => "mark",
            OperationKind::Stop => "stop",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Cut the cake in play at these axis positions.
    Cut { positions: Vec<Cut> },
    /// Take one of the current candidate shares.
    Select { player: PlayerId, candidate: usize },
    /// Declare which candidates are worth a fair share to `player`.
    Accept { player: PlayerId, candidates: Vec<usize> },
    /// Place n-1 markers splitting the axis into n equal parts (to `player`).
    Mark { player: PlayerId, positions: Vec<Cut> },
    /// Stop the moving knife with its left edge at `position`.
    Stop { position: f64 },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Cut { .. } => OperationKind::Cut,
            Operation::Select { .. } => OperationKind::Select,
            Operation::Accept { .. } => OperationKind::Accept,
            Operation::Mark { .. } => OperationKind::Mark,
            Operation::Stop { .. } => OperationKind::Stop,
        }
    }
}

fn check_player(state: &RunState, player: &PlayerId) -> Result<(), StepError> {
    if state.players.contains(player) {
        Ok(())
    } else {
        Err(StepError::UnknownPlayer(player.clone()))
    }
}

fn check_candidate(state: &RunState, index: usize) -> Result<(), StepError> {
    if index < state.candidates.len() {
        Ok(())
    } else {
        Err(StepError::InvalidOperation(format!(
            "candidate {index} out of range (0..{})",
            state.candidates.len()
        )))
    }
}

/// Candidates are replaced only while none of them has been handed out.
fn check_nothing_taken(state: &RunState, op: OperationKind) -> Result<(), StepError> {
    match state.taken.first() {
        None => Ok(()),
        Some(i) => Err(StepError::InvalidOperation(format!(
            "{op} would replace candidate {i}, which is already taken"
        ))),
    }
}

/// True when the cake in play is the whole axis.
fn whole_cake(state: &RunState, axis: f64) -> bool {
    match state.cake.as_slice() {
        [] => true,
        [only] => only.start == 0.0 && only.end == axis,
        _ => false,
    }
}

/// Applies `op` to `state`. On error `state` may be partially updated;
/// callers work on a staged copy.
pub fn apply(op: Operation, state: &mut RunState, engine: &CalculationEngine) -> Result<(), StepError> {
    let axis = engine.params().axis_length;
    match op {
        Operation::Cut { positions } => {
            check_nothing_taken(state, OperationKind::Cut)?;
            let sorted = sorted_cuts(&positions, axis)?;
            let (pieces, candidates) = if whole_cake(state, axis) {
                let pieces = engine.cut_to_pieces(&sorted)?;
                let candidates = pieces.iter().copied().map(Share::piece).collect();
                (pieces, candidates)
            } else {
                partition_cake(&state.cake, &sorted, axis)
            };
            state.cuts = sorted;
            state.pieces = pieces;
            state.candidates = candidates;
            state.taken.clear();
            state.acceptable.clear();
        }
        Operation::Select { player, candidate } => {
            check_player(state, &player)?;
            check_candidate(state, candidate)?;
            if state.selections.contains_key(&player) {
                return Err(StepError::InvalidOperation(format!("{player} already holds a share")));
            }
            if !state.taken.insert(candidate) {
                return Err(StepError::InvalidOperation(format!("candidate {candidate} is already taken")));
            }
            state.selections.insert(player, state.candidates[candidate].clone());
        }
        Operation::Accept { player, candidates } => {
            check_player(state, &player)?;
            let mut set = BTreeSet::new();
            for c in candidates {
                check_candidate(state, c)?;
                set.insert(c);
            }
            state.acceptable.insert(player, set);
        }
        Operation::Mark { player, positions } => {
            check_player(state, &player)?;
            let expected = state.players.len().saturating_sub(1);
            if positions.len() != expected {
                return Err(StepError::InvalidOperation(format!(
                    "{player} placed {} markers, expected {expected}",
                    positions.len()
                )));
            }
            let sorted = sorted_cuts(&positions, axis)?;
            state.markers.insert(player, sorted);
        }
        Operation::Stop { position } => {
            check_nothing_taken(state, OperationKind::Stop)?;
            let mover = state.divider.clone().ok_or(StepError::MissingInput("knife mover"))?;
            let valuation = state
                .valuations
                .get(&mover)
                .ok_or_else(|| StepError::UnknownPlayer(mover.clone()))?;
            let left = sorted_cuts(&[position], axis)?[0];
            let rest = [Span::new(left, axis)?];
            let half = engine.params().valuation_total / 2.0;
            let available = segments_value(&rest, engine.regions(), valuation)?;
            if available + engine.params().proportional_tolerance < half {
                return Err(StepError::InvalidOperation(format!(
                    "knife stopped at {left}: {mover} values the rest at {available:.2} < {half}"
                )));
            }
            let right = split_point(&rest, engine.regions(), valuation, half)?.position;
            let band = Span::new(left, right)?;
            let outside: Vec<Piece> = [Span { start: 0.0, end: left }, Span { start: right, end: axis }]
                .into_iter()
                .filter(|s| s.width() > 0.0)
                .collect();

            state.knives = Some((left, right));
            state.pieces = std::iter::once(band).chain(outside.iter().copied()).collect();
            state.candidates = vec![Share::piece(band), Share::segments(outside)];
            state.taken.clear();
        }
    }
    Ok(())
}

/// Splits a non-contiguous cake at axis positions: candidate `i` holds the
/// parts of the cake between consecutive boundaries.
fn partition_cake(cake: &[Piece], sorted: &[Cut], axis: f64) -> (Vec<Piece>, Vec<Share>) {
    let mut bounds = Vec::with_capacity(sorted.len() + 2);
    bounds.push(0.0);
    bounds.extend_from_slice(sorted);
    bounds.push(axis);

    let mut pieces = Vec::new();
    let mut candidates = Vec::with_capacity(bounds.len() - 1);
    for w in bounds.windows(2) {
        let window = Span { start: w[0], end: w[1] };
        let segs: Vec<Piece> = cake.iter().filter_map(|s| s.intersect(&window)).collect();
        pieces.extend(segs.iter().copied());
        candidates.push(Share::segments(segs));
    }
    (pieces, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::{Params, Region, RegionSet, Valuation};

    fn engine() -> CalculationEngine {
        let regions = RegionSet::new(vec![Region::span("all".parse().unwrap(), 0.0, 800.0).unwrap()]).unwrap();
        CalculationEngine::new(regions, Params::default())
    }

    fn state() -> RunState {
        let players: Vec<PlayerId> = (1..=2).map(PlayerId::numbered).collect();
        let v = Valuation::from_points([("all".parse().unwrap(), 100.0)]);
        RunState {
            valuations: players.iter().map(|p| (p.clone(), v.clone())).collect(),
            players,
            cake: vec![Span { start: 0.0, end: 800.0 }],
            divider: Some(PlayerId::numbered(1)),
            ..RunState::default()
        }
    }

    #[test]
    fn cut_replaces_candidates() {
        let e = engine();
        let mut s = state();
        apply(Operation::Cut { positions: vec![500.0, 200.0] }, &mut s, &e).unwrap();
        assert_eq!(s.cuts, vec![200.0, 500.0]);
        assert_eq!(s.candidates.len(), 3);
        assert_eq!(s.candidates[1], Share::piece(Span { start: 200.0, end: 500.0 }));

        let err = apply(Operation::Cut { positions: vec![900.0] }, &mut s, &e).unwrap_err();
        assert!(matches!(err, StepError::Geometry(_)));
    }

    #[test]
    fn a_candidate_can_only_be_taken_once() {
        let e = engine();
        let mut s = state();
        apply(Operation::Cut { positions: vec![400.0] }, &mut s, &e).unwrap();
        apply(Operation::Select { player: PlayerId::numbered(1), candidate: 0 }, &mut s, &e).unwrap();
        let again = Operation::Select { player: PlayerId::numbered(2), candidate: 0 };
        assert!(matches!(apply(again, &mut s, &e), Err(StepError::InvalidOperation(_))));
        let stranger = Operation::Select { player: PlayerId::numbered(7), candidate: 1 };
        assert!(matches!(apply(stranger, &mut s, &e), Err(StepError::UnknownPlayer(_))));
    }

    #[test]
    fn no_recut_once_a_candidate_is_taken() {
        let e = engine();
        let mut s = state();
        apply(Operation::Cut { positions: vec![400.0] }, &mut s, &e).unwrap();
        apply(Operation::Select { player: PlayerId::numbered(2), candidate: 0 }, &mut s, &e).unwrap();
        let recut = Operation::Cut { positions: vec![400.0] };
        assert!(matches!(apply(recut, &mut s, &e), Err(StepError::InvalidOperation(_))));
        let stop = Operation::Stop { position: 100.0 };
        assert!(matches!(apply(stop, &mut s, &e), Err(StepError::InvalidOperation(_))));
        assert_eq!(s.taken.len(), 1);
        assert_eq!(s.candidates.len(), 2);
    }

    #[test]
    fn cut_on_a_merged_cake_groups_segments() {
        let e = engine();
        let mut s = state();
        s.cake = vec![Span { start: 0.0, end: 100.0 }, Span { start: 500.0, end: 800.0 }];
        apply(Operation::Cut { positions: vec![600.0] }, &mut s, &e).unwrap();
        assert_eq!(
            s.candidates,
            vec![
                Share::segments(vec![Span { start: 0.0, end: 100.0 }, Span { start: 500.0, end: 600.0 }]),
                Share::piece(Span { start: 600.0, end: 800.0 }),
            ]
        );
    }

    #[test]
    fn stop_derives_the_right_knife() {
        let e = engine();
        let mut s = state();
        apply(Operation::Stop { position: 100.0 }, &mut s, &e).unwrap();
        let (l, r) = s.knives.unwrap();
        assert_eq!(l, 100.0);
        assert!((r - 500.0).abs() < 1e-6, "r = {r}");
        assert_eq!(s.candidates.len(), 2);

        let late = Operation::Stop { position: 700.0 };
        assert!(matches!(apply(late, &mut s, &e), Err(StepError::InvalidOperation(_))));
    }

    #[test]
    fn markers_need_n_minus_one_positions() {
        let e = engine();
        let mut s = state();
        let bad = Operation::Mark { player: PlayerId::numbered(1), positions: vec![100.0, 200.0] };
        assert!(matches!(apply(bad, &mut s, &e), Err(StepError::InvalidOperation(_))));
        apply(Operation::Mark { player: PlayerId::numbered(1), positions: vec![400.0] }, &mut s, &e).unwrap();
        assert_eq!(s.markers[&PlayerId::numbered(1)], vec![400.0]);
    }
}
