//! Austin's moving knife (2 players).
//!
//! P1 slides two knives so the band between them always holds exactly half
//! of the good by P1's measure. P2 calls "stop" when the band is worth half
//! to them as well; P2 then picks the band or the outside, and P1 takes
//! what is left. Both end up with exactly half by their own measure.
//!
//! A stop is expressed as the left knife position; the right knife is
//! derived from the mover's valuation.

use fd_core::{PlayerId, Span};

use crate::algorithms::{auto_advance, best_candidate, require, results_enter, AlgorithmEntry};
use crate::config::{AlgorithmConfig, AlgorithmStep, ConfigError, Hooks};
use crate::machine::{RunState, StepApi, StepCtx, StepError};
use crate::operation::{Operation, OperationKind};

pub const ID: &str = "austin-moving-knife";

/// Halvings of the left-knife interval before the caller says stop.
const STOP_SEARCH_STEPS: u32 = 48;

pub fn entry() -> Result<AlgorithmEntry, ConfigError> {
    AlgorithmEntry::new(ID, "Austin's Moving Knife", "exact half-half division with two knives", 2..=2, config)
}

pub fn config(player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
    Ok(AlgorithmConfig::new(ID, "Austin's Moving Knife", player_count)?
        .hooks(Hooks { on_init: mover_is_p1, ..Hooks::default() })
        .step(
            AlgorithmStep::new("knives", "Move the knives")?
                .instructions("P1 moves both knives keeping half the value between them; P2 calls stop.")
                .enable(&[OperationKind::Stop])
                .on_enter(knives_enter)
                .on_exit(knives_exit),
        )
        .step(
            AlgorithmStep::new("choose", "Choose")?
                .instructions("P2 takes either the band between the knives or everything outside it.")
                .enable(&[OperationKind::Select])
                .on_enter(choose_enter)
                .on_exit(choose_exit),
        )
        .step(
            AlgorithmStep::new("results", "Results")?
                .instructions("P1 receives the other part.")
                .on_enter(results_enter),
        ))
}

fn mover_is_p1(run: &mut RunState) {
    run.divider = run.players.first().cloned();
}

/// P2's value of the band starting at `left`, minus their target.
fn caller_gap(
    ctx: &mut StepCtx<'_>,
    mover: &PlayerId,
    caller: &PlayerId,
    left: f64,
    half: f64,
    target: f64,
) -> Result<f64, StepError> {
    let axis = ctx.params().axis_length;
    let right = ctx.split_point(&[Span { start: left, end: axis }], mover, half)?.position;
    Ok(ctx.piece_value(&Span { start: left, end: right }, caller)? - target)
}

fn knives_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let mover = ctx.player(1)?;
    let caller = ctx.player(2)?;
    let whole = ctx.whole();
    let half = ctx.params().valuation_total / 2.0;
    let mover_total = ctx.piece_value(&whole, mover)?;
    let target = ctx.piece_value(&whole, caller)? / 2.0;

    // Furthest left-knife position that still leaves half for the band.
    let last = ctx.split_point(&[whole], mover, (mover_total - half).max(0.0))?.position;

    let (mut lo, mut hi) = (0.0_f64, last);
    let lo_sign = caller_gap(ctx, mover, caller, lo, half, target)? >= 0.0;
    for _ in 0..STOP_SEARCH_STEPS {
        if hi - lo <= f64::EPSILON {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if (caller_gap(ctx, mover, caller, mid, half, target)? >= 0.0) == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    api.notice(format!("{caller} calls stop with the left knife at {lo:.1}"));
    api.perform(Operation::Stop { position: lo });
    auto_advance(ctx, api);
    Ok(())
}

fn knives_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    require(ctx.state.knives.is_some(), "knife stop")
}

fn choose_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let caller = ctx.player(2)?;
    let pick = best_candidate(ctx, caller)?;
    let what = if pick == 0 { "the band" } else { "the outside" };
    api.notice(format!("{caller} takes {what}"));
    api.perform(Operation::Select { player: caller.clone(), candidate: pick });
    auto_advance(ctx, api);
    Ok(())
}

fn choose_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    let caller = ctx.player(2)?;
    require(ctx.state.selections.contains_key(caller), "caller's selection")
}
