//! crates/fd_pipeline/src/algorithms/mod.rs
//! Registry of fair-division procedures plus helpers shared by their steps.
//!
//! Each procedure is a builder `fn(player_count) -> AlgorithmConfig`; the
//! registry checks the player range before building and validates what the
//! builder returns, so a malformed procedure never gets registered.

use std::collections::BTreeMap;

use fd_core::{AlgorithmId, Allocation, Piece, PlayerId, Share, Span};

use crate::config::{AlgorithmConfig, ConfigError};
use crate::machine::{RunState, StepApi, StepCtx, StepError};

pub mod divide_and_choose;
pub mod steinhaus;
pub mod moving_knife;
pub mod lucas;
pub mod knaster;

pub type ConfigBuilder = fn(usize) -> Result<AlgorithmConfig, ConfigError>;

#[derive(Clone, Debug)]
pub struct AlgorithmEntry {
    pub id: AlgorithmId,
    pub name: &'static str,
    pub summary: &'static str,
    pub min_players: usize,
    pub max_players: usize,
    pub build: ConfigBuilder,
}

impl AlgorithmEntry {
    pub fn new(
        id: &str,
        name: &'static str,
        summary: &'static str,
        players: std::ops::RangeInclusive<usize>,
        build: ConfigBuilder,
    ) -> Result<Self, ConfigError> {
        Ok(AlgorithmEntry {
            id: id.parse().map_err(|_| ConfigError::InvalidId(id.to_string()))?,
            name,
            summary,
            min_players: *players.start(),
            max_players: *players.end(),
            build,
        })
    }

    pub fn supports(&self, player_count: usize) -> bool {
        (self.min_players..=self.max_players).contains(&player_count)
    }
}

#[derive(Clone, Debug, Default)]
pub struct AlgorithmRegistry {
    entries: BTreeMap<AlgorithmId, AlgorithmEntry>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in procedures.
    pub fn standard() -> Result<Self, ConfigError> {
        let mut r = AlgorithmRegistry::new();
        r.register(divide_and_choose::entry()?)?;
        r.register(steinhaus::entry()?)?;
        r.register(moving_knife::entry()?)?;
        r.register(lucas::entry()?)?;
        r.register(knaster::entry()?)?;
        Ok(r)
    }

    /// Builds the entry's config for every supported player count and
    /// validates each; nothing is registered on error.
    pub fn register(&mut self, entry: AlgorithmEntry) -> Result<(), ConfigError> {
        if self.entries.contains_key(&entry.id) {
            return Err(ConfigError::AlreadyRegistered(entry.id));
        }
        for n in entry.min_players..=entry.max_players {
            (entry.build)(n)?.validate()?;
        }
        tracing::debug!(algorithm = %entry.id, "procedure registered");
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &AlgorithmId) -> Option<&AlgorithmEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A validated config of `id` for `player_count` players.
    pub fn config(&self, id: &AlgorithmId, player_count: usize) -> Result<AlgorithmConfig, ConfigError> {
        let entry = self.get(id).ok_or_else(|| ConfigError::UnknownAlgorithm(id.to_string()))?;
        if !entry.supports(player_count) {
            return Err(ConfigError::PlayerCountMismatch { id: id.clone(), count: player_count });
        }
        let config = (entry.build)(player_count)?;
        config.validate()?;
        Ok(config)
    }
}

/* --------------------------- shared step helpers --------------------------- */

/// Queues the paced advance when the run is autoplaying.
pub(crate) fn auto_advance(ctx: &StepCtx<'_>, api: &mut StepApi) {
    if ctx.autoplay() {
        api.advance_after(ctx.delay_ms());
    }
}

/// Untaken candidate `player` values most; ties go to the lowest index.
pub(crate) fn best_candidate(ctx: &mut StepCtx<'_>, player: &PlayerId) -> Result<usize, StepError> {
    let state = ctx.state;
    let mut best: Option<(usize, f64)> = None;
    for (i, share) in state.candidates.iter().enumerate() {
        if state.taken.contains(&i) {
            continue;
        }
        let v = ctx.share_value(share, player)?;
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i).ok_or(StepError::MissingInput("untaken candidate"))
}

/// Every player's selection; players without one receive the untaken
/// candidates in index order. Candidates left over go to `leftover`.
pub(crate) fn allocation_from_selections(state: &RunState) -> Result<Allocation, StepError> {
    let mut free = (0..state.candidates.len()).filter(|i| !state.taken.contains(i));
    let mut shares = BTreeMap::new();
    for p in &state.players {
        let share = match state.selections.get(p) {
            Some(s) => s.clone(),
            None => {
                let i = free.next().ok_or(StepError::MissingInput("unclaimed candidate"))?;
                state.candidates[i].clone()
            }
        };
        shares.insert(p.clone(), share);
    }
    let mut leftover = Vec::new();
    for i in free {
        if let Share::Segments { pieces } = &state.candidates[i] {
            leftover.extend(pieces.iter().copied().filter(|p| p.width() > 0.0));
        }
    }
    Ok(Allocation::new(shares).with_leftover(leftover))
}

/// Parts of `[0, axis]` not covered by `taken`, positive width only.
pub(crate) fn complement(taken: &[Piece], axis: f64) -> Vec<Piece> {
    let mut sorted: Vec<Piece> = taken.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut out = Vec::new();
    let mut cursor = 0.0_f64;
    for p in sorted {
        if p.start > cursor {
            out.push(Span { start: cursor, end: p.start });
        }
        cursor = cursor.max(p.end);
    }
    if axis > cursor {
        out.push(Span { start: cursor, end: axis });
    }
    out
}

pub(crate) fn require(ok: bool, what: &'static str) -> Result<(), StepError> {
    if ok { Ok(()) } else { Err(StepError::MissingInput(what)) }
}

/// Terminal step shared by every procedure: announce the outcome.
pub(crate) fn results_enter(ctx: &mut StepCtx<'_>, api: &mut StepApi) -> Result<(), StepError> {
    match &ctx.state.allocation {
        Some(a) => api.notice(format!("{} shares allocated", a.len())),
        None => {
            let allocation = allocation_from_selections(ctx.state)?;
            api.notice(format!("{} shares allocated", allocation.len()));
            api.finish(allocation);
        }
    }
    auto_advance(ctx, api);
    Ok(())
}
