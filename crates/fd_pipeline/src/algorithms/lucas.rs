//! Lucas' method of markers (2–4 players).
//!
//! Every player places n−1 markers splitting the good into n parts of
//! equal value to them. The sweep then hands out, left to right, the part
//! ending at the leftmost k-th marker among players still waiting; the last
//! player takes everything after their final marker. Whatever falls between
//! the parts handed out is recorded as leftover.

use std::collections::BTreeMap;

use fd_core::{Allocation, Cut, PlayerId, Share, Span};

use crate::algorithms::{auto_advance, complement, require, results_enter, AlgorithmEntry};
use crate::config::{AlgorithmConfig, AlgorithmStep, ConfigError};
use crate::machine::{RunState, StepApi, StepCtx, StepError};
use crate::operation::{Operation, OperationKind};

pub const ID: &str = "lucas-markers";

pub fn entry() -> Result<AlgorithmEntry, ConfigError> {
    AlgorithmEntry::new(ID, "Lucas' Method of Markers", "markers swept left to right", 2..=4, config)
}

pub fn config(player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
    Ok(AlgorithmConfig::new(ID, "Lucas' Method of Markers", player_count)?
        .step(
            AlgorithmStep::new("markers", "Place markers")?
                .instructions("Every player places n−1 markers splitting the good into n parts of equal value to them.")
                .enable(&[OperationKind::Mark])
                .on_enter(markers_enter)
                .on_exit(markers_exit),
        )
        .step(
            AlgorithmStep::new("allocate", "Allocate")?
                .instructions("Sweep left to right; the first marker reached wins the part before it.")
                .on_enter(allocate_enter),
        )
        .step(
            AlgorithmStep::new("results", "Results")?
                .instructions("Each player holds a part worth 1/n to them; leftovers stay unassigned.")
                .on_enter(results_enter),
        ))
}

fn markers_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let state = ctx.state;
    let n = state.players.len();
    let whole = ctx.whole();
    for player in &state.players {
        let total = ctx.piece_value(&whole, player)?;
        let mut positions: Vec<Cut> = Vec::with_capacity(n.saturating_sub(1));
        for k in 1..n {
            positions.push(ctx.split_point(&[whole], player, total * k as f64 / n as f64)?.position);
        }
        api.perform(Operation::Mark { player: player.clone(), positions });
    }
    auto_advance(ctx, api);
    Ok(())
}

fn markers_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    let state = ctx.state;
    require(state.players.iter().all(|p| state.markers.contains_key(p)), "markers from every player")
}

/// The left-to-right sweep over the players' markers.
pub(crate) fn sweep(state: &RunState, axis: f64) -> Result<Allocation, StepError> {
    let n = state.players.len();
    let mut waiting: Vec<&PlayerId> = state.players.iter().collect();
    let markers = |p: &PlayerId| {
        state
            .markers
            .get(p)
            .filter(|m| m.len() + 1 == n)
            .ok_or(StepError::MissingInput("markers from every player"))
    };

    let mut shares = BTreeMap::new();
    for k in 0..n.saturating_sub(1) {
        let mut winner: Option<(usize, Cut)> = None;
        for (i, p) in waiting.iter().enumerate() {
            let m = markers(*p)?[k];
            if winner.map_or(true, |(_, best)| m < best) {
                winner = Some((i, m));
            }
        }
        let Some((i, end)) = winner else { break };
        let p = waiting.remove(i);
        let start = if k == 0 { 0.0 } else { markers(p)?[k - 1] };
        shares.insert(p.clone(), Share::piece(Span { start, end }));
    }
    if let Some(last) = waiting.first() {
        let start = match markers(*last)?.last() {
            Some(&m) => m,
            None => 0.0,
        };
        shares.insert((*last).clone(), Share::piece(Span { start, end: axis }));
    }

    let given: Vec<_> = shares
        .values()
        .filter_map(|s| match s {
            Share::Segments { pieces } => pieces.first().copied(),
            Share::Bundle { .. } => None,
        })
        .collect();
    Ok(Allocation::new(shares).with_leftover(complement(&given, axis)))
}

fn allocate_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    let axis = ctx.params().axis_length;
    let allocation = sweep(ctx.state, axis)?;
    for (player, share) in allocation.iter() {
        if let Share::Segments { pieces } = share {
            if let Some(p) = pieces.first() {
                api.notice(format!("{player} receives [{:.1}, {:.1}]", p.start, p.end));
            }
        }
    }
    api.finish(allocation);
    auto_advance(ctx, api);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(markers: &[&[f64]]) -> RunState {
        let players: Vec<PlayerId> = (1..=markers.len()).map(PlayerId::numbered).collect();
        RunState {
            markers: players.iter().cloned().zip(markers.iter().map(|m| m.to_vec())).collect(),
            players,
            ..RunState::default()
        }
    }

    #[test]
    fn leftmost_marker_wins_each_round() {
        let s = state(&[&[300.0, 600.0], &[200.0, 500.0], &[250.0, 550.0]]);
        let a = sweep(&s, 900.0).unwrap();
        let piece = |n| a.share(&PlayerId::numbered(n)).cloned();
        assert_eq!(piece(2), Some(Share::piece(Span { start: 0.0, end: 200.0 })));
        assert_eq!(piece(3), Some(Share::piece(Span { start: 250.0, end: 550.0 })));
        assert_eq!(piece(1), Some(Share::piece(Span { start: 600.0, end: 900.0 })));
        assert_eq!(
            a.leftover(),
            &[Span { start: 200.0, end: 250.0 }, Span { start: 550.0, end: 600.0 }]
        );
    }

    #[test]
    fn ties_go_to_the_lower_seat() {
        let s = state(&[&[400.0], &[400.0]]);
        let a = sweep(&s, 800.0).unwrap();
        assert_eq!(a.share(&PlayerId::numbered(1)), Some(&Share::piece(Span { start: 0.0, end: 400.0 })));
        assert!(a.leftover().is_empty());
    }

    #[test]
    fn missing_markers_are_reported() {
        let mut s = state(&[&[400.0], &[400.0]]);
        s.markers.remove(&PlayerId::numbered(2));
        assert_eq!(sweep(&s, 800.0), Err(StepError::MissingInput("markers from every player")));
    }
}
