//! Knaster's sealed bids (2–4 players), discrete goods.
//!
//! Every region is an indivisible item and a player's valuation is their
//! sealed bid on it. Each item goes to its highest bidder (ties to the
//! lowest seat). A player's fair share is total/n of their own bids; the
//! winners pay in what they won above it, and the surplus is split equally.

use std::collections::BTreeMap;

use fd_core::{Allocation, PlayerId, RegionId, RegionSet, Share, Valuations};

use crate::algorithms::{auto_advance, results_enter, AlgorithmEntry};
use crate::config::{AlgorithmConfig, AlgorithmStep, ConfigError};
use crate::machine::{StepApi, StepCtx, StepError};

pub const ID: &str = "knaster-sealed-bids";

pub fn entry() -> Result<AlgorithmEntry, ConfigError> {
    AlgorithmEntry::new(ID, "Knaster's Sealed Bids", "items to the highest bidder, cash settles the rest", 2..=4, config)
}

pub fn config(player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
    Ok(AlgorithmConfig::new(ID, "Knaster's Sealed Bids", player_count)?
        .step(
            AlgorithmStep::new("bids", "Sealed bids")?
                .instructions("Each player's valuation of a region is their bid for it.")
                .on_enter(bids_enter),
        )
        .step(
            AlgorithmStep::new("award", "Award")?
                .instructions("Items go to the highest bidder; cash compensation evens out fair shares.")
                .on_enter(award_enter),
        )
        .step(
            AlgorithmStep::new("results", "Results")?
                .instructions("Every player ends with their fair share plus an equal part of the surplus.")
                .on_enter(results_enter),
        ))
}

fn bids_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    let n = ctx.state.players.len();
    api.notice(format!("{n} players bid on {} items", ctx.regions().len()));
    auto_advance(ctx, api);
    Ok(())
}

/// Item awards and cash settlement.
pub(crate) fn settle(players: &[PlayerId], valuations: &Valuations, regions: &RegionSet) -> Result<Allocation, StepError> {
    if players.is_empty() {
        return Err(StepError::MissingInput("players"));
    }
    let bids = |p: &PlayerId| valuations.get(p).ok_or_else(|| StepError::UnknownPlayer(p.clone()));

    let mut items: BTreeMap<&PlayerId, Vec<RegionId>> = players.iter().map(|p| (p, Vec::new())).collect();
    let mut won: BTreeMap<&PlayerId, f64> = players.iter().map(|p| (p, 0.0)).collect();
    for region in regions.ids() {
        let mut top: Option<(&PlayerId, f64)> = None;
        for p in players {
            let bid = bids(p)?.get(region);
            if top.map_or(true, |(_, b)| bid > b) {
                top = Some((p, bid));
            }
        }
        if let Some((p, bid)) = top {
            items.entry(p).or_default().push(region.clone());
            *won.entry(p).or_default() += bid;
        }
    }

    let n = players.len() as f64;
    let mut excess = BTreeMap::new();
    for p in players {
        let valuation = bids(p)?;
        let fair: f64 = regions.ids().map(|r| valuation.get(r)).sum::<f64>() / n;
        excess.insert(p, won.get(p).copied().unwrap_or(0.0) - fair);
    }
    let surplus: f64 = excess.values().sum();

    let shares = players
        .iter()
        .map(|p| {
            let cash = surplus / n - excess.get(p).copied().unwrap_or(0.0);
            let items = items.remove(p).unwrap_or_default();
            (p.clone(), Share::Bundle { items, cash })
        })
        .collect();
    Ok(Allocation::new(shares))
}

fn award_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    let state = ctx.state;
    let allocation = settle(&state.players, &state.valuations, ctx.regions())?;
    for (player, share) in allocation.iter() {
        if let Share::Bundle { items, cash } = share {
            let names: Vec<&str> = items.iter().map(|r| r.as_str()).collect();
            api.notice(format!("{player} wins [{}], cash {cash:+.2}", names.join(", ")));
        }
    }
    api.finish(allocation);
    auto_advance(ctx, api);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::{Region, Valuation};

    fn rid(s: &str) -> RegionId {
        s.parse().unwrap()
    }

    #[test]
    fn two_player_settlement() {
        let regions = RegionSet::new(vec![
            Region::span(rid("a"), 0.0, 400.0).unwrap(),
            Region::span(rid("b"), 400.0, 800.0).unwrap(),
        ])
        .unwrap();
        let players: Vec<PlayerId> = (1..=2).map(PlayerId::numbered).collect();
        let valuations: Valuations = [
            (players[0].clone(), Valuation::from_points([(rid("a"), 60.0), (rid("b"), 40.0)])),
            (players[1].clone(), Valuation::from_points([(rid("a"), 30.0), (rid("b"), 70.0)])),
        ]
        .into_iter()
        .collect();

        let a = settle(&players, &valuations, &regions).unwrap();
        assert_eq!(a.share(&players[0]), Some(&Share::Bundle { items: vec![rid("a")], cash: 5.0 }));
        assert_eq!(a.share(&players[1]), Some(&Share::Bundle { items: vec![rid("b")], cash: -5.0 }));
    }

    #[test]
    fn tied_bids_go_to_the_lower_seat() {
        let regions = RegionSet::new(vec![Region::span(rid("a"), 0.0, 800.0).unwrap()]).unwrap();
        let players: Vec<PlayerId> = (1..=2).map(PlayerId::numbered).collect();
        let v = Valuation::from_points([(rid("a"), 100.0)]);
        let valuations: Valuations = players.iter().map(|p| (p.clone(), v.clone())).collect();
        let a = settle(&players, &valuations, &regions).unwrap();
        assert_eq!(a.share(&players[0]), Some(&Share::Bundle { items: vec![rid("a")], cash: -50.0 }));
        assert_eq!(a.share(&players[1]), Some(&Share::Bundle { items: vec![], cash: 50.0 }));
    }
}
