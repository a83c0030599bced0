//! Steinhaus lone divider (3 players).
//!
//! P1 cuts three pieces of equal value to them. P2 and P3 each name the
//! pieces they find acceptable (worth at least a third to them).
//!
//! - Case A: the choosers can be given distinct acceptable pieces. They
//!   are, and P1 takes the remaining one.
//! - Case B: both accept only the same single piece. P1 takes a piece
//!   nobody accepted; the other two are merged and split between P2 and
//!   P3 by divide and choose (P2 cuts, P3 chooses).

use std::collections::BTreeSet;

use fd_algo::split_segments;
use fd_core::{Piece, PlayerId, Share};

use crate::algorithms::{auto_advance, require, results_enter, AlgorithmEntry};
use crate::config::{AlgorithmConfig, AlgorithmStep, ConfigError, Hooks};
use crate::machine::{RunState, StepApi, StepCtx, StepError};
use crate::operation::{Operation, OperationKind};

pub const ID: &str = "steinhaus-lone-divider";

pub fn entry() -> Result<AlgorithmEntry, ConfigError> {
    AlgorithmEntry::new(ID, "Steinhaus Lone Divider", "three-way proportional division with one divider", 3..=3, config)
}

pub fn config(player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
    Ok(AlgorithmConfig::new(ID, "Steinhaus Lone Divider", player_count)?
        .hooks(Hooks { on_init: divider_is_p1, ..Hooks::default() })
        .step(
            AlgorithmStep::new("divide", "Divide")?
                .instructions("P1 cuts the good into three pieces of equal value to them.")
                .enable(&[OperationKind::Cut])
                .on_enter(divide_enter)
                .on_exit(divide_exit),
        )
        .step(
            AlgorithmStep::new("evaluate", "Evaluate")?
                .instructions("P2 and P3 mark every piece worth at least a third to them.")
                .enable(&[OperationKind::Accept])
                .on_enter(evaluate_enter)
                .on_exit(evaluate_exit),
        )
        .step(
            AlgorithmStep::new("resolve", "Resolve")?
                .instructions("Hand out acceptable pieces, or re-divide the contested part between P2 and P3.")
                .enable(&[OperationKind::Cut, OperationKind::Select])
                .on_enter(resolve_enter)
                .on_exit(resolve_exit),
        )
        .step(
            AlgorithmStep::new("results", "Results")?
                .instructions("Every player holds a piece worth at least a third to them.")
                .on_enter(results_enter),
        ))
}

fn divider_is_p1(run: &mut RunState) {
    run.divider = run.players.first().cloned();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Case {
    /// Distinct acceptable pieces exist for both choosers.
    Distinct,
    /// Both choosers accept only this piece.
    Contested(usize),
}

fn accepted<'s>(state: &'s RunState, player: &PlayerId) -> Result<&'s BTreeSet<usize>, StepError> {
    state
        .acceptable
        .get(player)
        .filter(|s| !s.is_empty())
        .ok_or(StepError::MissingInput("acceptable pieces for every chooser"))
}

fn classify(state: &RunState, p2: &PlayerId, p3: &PlayerId) -> Result<Case, StepError> {
    let a2 = accepted(state, p2)?;
    let a3 = accepted(state, p3)?;
    match (a2.len(), a2 == a3, a2.first()) {
        (1, true, Some(&k)) => Ok(Case::Contested(k)),
        _ => Ok(Case::Distinct),
    }
}

fn divide_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let state = ctx.state;
    let divider = ctx.player(1)?;
    let positions = match state.preset_cuts.as_slice() {
        [a, b] => vec![*a, *b],
        _ => {
            let whole = ctx.whole();
            let total = ctx.piece_value(&whole, divider)?;
            let first = ctx.split_point(&[whole], divider, total / 3.0)?.position;
            let second = ctx.split_point(&[whole], divider, 2.0 * total / 3.0)?.position;
            vec![first, second]
        }
    };
    api.notice(format!("{divider} cuts at {:.1} and {:.1}", positions[0], positions[1]));
    api.perform(Operation::Cut { positions });
    auto_advance(ctx, api);
    Ok(())
}

fn divide_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    require(ctx.state.candidates.len() == 3, "two cuts")
}

fn evaluate_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let state = ctx.state;
    let tolerance = ctx.params().proportional_tolerance;
    let whole = ctx.whole();
    for seat in 2..=3 {
        let player = ctx.player(seat)?;
        let threshold = ctx.piece_value(&whole, player)? / 3.0 - tolerance;
        let mut ok = Vec::new();
        for (i, share) in state.candidates.iter().enumerate() {
            if ctx.share_value(share, player)? >= threshold {
                ok.push(i);
            }
        }
        api.perform(Operation::Accept { player: player.clone(), candidates: ok });
    }
    auto_advance(ctx, api);
    Ok(())
}

fn evaluate_exit(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    let (p2, p3) = (ctx.player(2)?, ctx.player(3)?);
    match classify(ctx.state, p2, p3)? {
        Case::Distinct => api.notice("case A: the choosers accept distinct pieces"),
        Case::Contested(k) => api.notice(format!("case B: {p2} and {p3} only accept piece {}", k + 1)),
    }
    Ok(())
}

fn resolve_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    let state = ctx.state;
    let (p1, p2, p3) = (ctx.player(1)?, ctx.player(2)?, ctx.player(3)?);

    match classify(state, p2, p3)? {
        Case::Distinct => {
            if ctx.autoplay() {
                let (a, b) = best_pair(ctx, p2, p3)?;
                api.perform(Operation::Select { player: p2.clone(), candidate: a });
                api.perform(Operation::Select { player: p3.clone(), candidate: b });
                api.notice(format!("{p2} takes piece {}, {p3} takes piece {}", a + 1, b + 1));
            }
        }
        Case::Contested(k) => {
            let a2 = accepted(state, p2)?;
            let own = (0..state.candidates.len())
                .find(|i| *i != k && !a2.contains(i))
                .ok_or(StepError::MissingInput("a piece nobody accepted"))?;
            api.perform(Operation::Select { player: p1.clone(), candidate: own });
            api.notice(format!("{p1} takes piece {}; the rest is re-divided", own + 1));

            let mut remainder: Vec<Piece> = state
                .candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != own)
                .flat_map(|(_, share)| match share {
                    Share::Segments { pieces } => pieces.clone(),
                    Share::Bundle { .. } => Vec::new(),
                })
                .filter(|p| p.width() > 0.0)
                .collect();
            remainder.sort_by(|a, b| a.start.total_cmp(&b.start));
            api.set_cake(remainder.clone());

            if ctx.autoplay() {
                let worth = segments_worth(ctx, &remainder, p2)?;
                let cut = ctx.split_point(&remainder, p2, worth / 2.0)?;
                let (left, right) = split_segments(&remainder, cut.offset);
                let pick = if segments_worth(ctx, &left, p3)? >= segments_worth(ctx, &right, p3)? { 0 } else { 1 };
                api.perform(Operation::Cut { positions: vec![cut.position] });
                api.perform(Operation::Select { player: p3.clone(), candidate: pick });
                api.notice(format!("{p2} cuts the rest at {:.1}, {p3} chooses piece {}", cut.position, pick + 1));
            }
        }
    }
    auto_advance(ctx, api);
    Ok(())
}

fn resolve_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    let state = ctx.state;
    require(state.selections.len() + 1 >= state.players.len(), "selections for all but one player")
}

fn segments_worth(ctx: &mut StepCtx<'_>, segments: &[Piece], player: &PlayerId) -> Result<f64, StepError> {
    let mut total = 0.0;
    for s in segments {
        total += ctx.piece_value(s, player)?;
    }
    Ok(total)
}

/// Distinct acceptable pieces `(a, b)` for P2 and P3 maximizing the sum of
/// their values; ties go to the lexicographically smallest pair.
fn best_pair(ctx: &mut StepCtx<'_>, p2: &PlayerId, p3: &PlayerId) -> Result<(usize, usize), StepError> {
    let state = ctx.state;
    let (a2, a3) = (accepted(state, p2)?, accepted(state, p3)?);
    let mut best: Option<(usize, usize, f64)> = None;
    for &a in a2 {
        for &b in a3 {
            if a == b {
                continue;
            }
            let v = ctx.share_value(&state.candidates[a], p2)? + ctx.share_value(&state.candidates[b], p3)?;
            if best.map_or(true, |(_, _, x)| v > x) {
                best = Some((a, b, v));
            }
        }
    }
    best.map(|(a, b, _)| (a, b)).ok_or(StepError::MissingInput("distinct acceptable pieces"))
}
