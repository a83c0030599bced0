//! Divide and choose (2 players): P1 cuts the good into two pieces worth
//! the same to them, P2 takes the piece they prefer, P1 keeps the other.

use crate::algorithms::{allocation_from_selections, auto_advance, best_candidate, require, results_enter, AlgorithmEntry};
use crate::config::{AlgorithmConfig, AlgorithmStep, ConfigError, Hooks};
use crate::machine::{RunState, StepApi, StepCtx, StepError};
use crate::operation::{Operation, OperationKind};

pub const ID: &str = "divide-and-choose";

pub fn entry() -> Result<AlgorithmEntry, ConfigError> {
    AlgorithmEntry::new(ID, "Divide and Choose", "one cut, the other player chooses", 2..=2, config)
}

pub fn config(player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
    Ok(AlgorithmConfig::new(ID, "Divide and Choose", player_count)?
        .hooks(Hooks { on_init: divider_is_p1, ..Hooks::default() })
        .step(
            AlgorithmStep::new("divide", "Divide")?
                .instructions("P1 places one cut so that both pieces are worth the same to them.")
                .enable(&[OperationKind::Cut])
                .on_enter(divide_enter)
                .on_exit(divide_exit),
        )
        .step(
            AlgorithmStep::new("choose", "Choose")?
                .instructions("P2 takes whichever piece they value more.")
                .enable(&[OperationKind::Select])
                .on_enter(choose_enter)
                .on_exit(choose_exit),
        )
        .step(
            AlgorithmStep::new("results", "Results")?
                .instructions("P1 keeps the remaining piece.")
                .on_enter(results_enter),
        ))
}

fn divider_is_p1(run: &mut RunState) {
    run.divider = run.players.first().cloned();
}

fn divide_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let state = ctx.state;
    let divider = ctx.player(1)?;
    let position = match state.preset_cuts.as_slice() {
        [x] => *x,
        _ => {
            let whole = ctx.whole();
            let total = ctx.piece_value(&whole, divider)?;
            ctx.split_point(&[whole], divider, total / 2.0)?.position
        }
    };
    api.notice(format!("{divider} cuts at {position:.1}"));
    api.perform(Operation::Cut { positions: vec![position] });
    auto_advance(ctx, api);
    Ok(())
}

fn divide_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    require(ctx.state.candidates.len() == 2, "one cut")
}

fn choose_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    if !ctx.autoplay() {
        return Ok(());
    }
    let chooser = ctx.player(2)?;
    let pick = best_candidate(ctx, chooser)?;
    api.notice(format!("{chooser} chooses piece {}", pick + 1));
    api.perform(Operation::Select { player: chooser.clone(), candidate: pick });
    auto_advance(ctx, api);
    Ok(())
}

fn choose_exit(ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    let chooser = ctx.player(2)?;
    require(ctx.state.selections.contains_key(chooser), "chooser's selection")?;
    allocation_from_selections(ctx.state).map(|_| ())
}
