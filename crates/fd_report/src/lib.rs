// crates/fd_report/src/lib.rs
//! fd_report: presentation model for a recorded `RunResult`, plus the
//! JSON and plain-text renderers.
//!
//! The model is built once from the result and never recomputes fairness:
//! every number comes from `RunResult::values` and `RunResult::fairness`.
//! Numbers are pre-formatted here (one decimal) so both renderers print
//! exactly the same strings.

#![forbid(unsafe_code)]

use serde::Serialize;
use thiserror::Error;

use fd_core::{PlayerId, Share};
use fd_pipeline::RunResult;

#[cfg(feature = "render_json")]
pub mod render_json;
#[cfg(feature = "render_text")]
pub mod render_text;

#[cfg(feature = "render_json")]
pub use render_json::{render_json, render_json_string};
#[cfg(feature = "render_text")]
pub use render_text::render_text;

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("inconsistent result: {0}")]
    Inconsistent(String),
    #[error("render: {0}")]
    Render(String),
}

/// Overall verdict shown next to the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Proportional, envy-free and equitable.
    Fair,
    /// At least one of the three holds.
    Partial,
    Unfair,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Fair => "fair",
            Verdict::Partial => "partially fair",
            Verdict::Unfair => "unfair",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryBlock {
    pub algorithm: String,
    pub algorithm_name: String,
    pub player_count: usize,
    pub verdict: Verdict,
    pub score_pct_1dp: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationRow {
    pub player: String,
    /// Human description: `[0.0, 400.0]`, or `items a, b; cash +5.00`.
    pub share: String,
    pub own_value_1dp: String,
    pub proportional: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationBlock {
    pub rows: Vec<AllocationRow>,
    pub leftover: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyLine {
    pub name: &'static str,
    pub pass: bool,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnvyCell {
    pub owner: String,
    pub value_1dp: String,
    pub envies: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnvyRow {
    pub evaluator: String,
    pub cells: Vec<EnvyCell>,
}

/// Row = evaluator, column = owner; the diagonal is the evaluator's own share.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnvyBlock {
    pub players: Vec<String>,
    pub rows: Vec<EnvyRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntegrityBlock {
    pub result_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub steps_entered: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportModel {
    pub summary: SummaryBlock,
    pub allocation: AllocationBlock,
    pub properties: Vec<PropertyLine>,
    pub envy: EnvyBlock,
    pub integrity: IntegrityBlock,
}

/// One decimal, never `-0.0`.
pub fn fmt_1dp(x: f64) -> String {
    let s = format!("{x:.1}");
    if s == "-0.0" { "0.0".into() } else { s }
}

/// `fmt_1dp` with a percent sign.
pub fn pct_1dp(x: f64) -> String {
    format!("{}%", fmt_1dp(x))
}

fn fmt_cash(cash: f64) -> String {
    let s = format!("{cash:+.2}");
    if s == "-0.00" { "+0.00".into() } else { s }
}

pub fn describe_share(share: &Share) -> String {
    match share {
        Share::Segments { pieces } if pieces.is_empty() => "nothing".into(),
        Share::Segments { pieces } => pieces
            .iter()
            .map(|p| format!("[{}, {}]", fmt_1dp(p.start), fmt_1dp(p.end)))
            .collect::<Vec<_>>()
            .join(" + "),
        Share::Bundle { items, cash } => {
            let items = if items.is_empty() {
                "no items".to_string()
            } else {
                let names: Vec<&str> = items.iter().map(|r| r.as_str()).collect();
                format!("items {}", names.join(", "))
            };
            format!("{items}; cash {}", fmt_cash(*cash))
        }
    }
}

fn value(result: &RunResult, evaluator: &PlayerId, owner: &PlayerId) -> Result<f64, ReportError> {
    result
        .values
        .get(evaluator)
        .and_then(|row| row.get(owner))
        .copied()
        .ok_or_else(|| ReportError::Inconsistent(format!("no value of {owner}'s share for {evaluator}")))
}

fn properties(result: &RunResult) -> Vec<PropertyLine> {
    let f = &result.fairness;

    let envy_detail = if f.envy_free.violations.is_empty() {
        "nobody prefers another player's share".to_string()
    } else {
        f.envy_free
            .violations
            .iter()
            .map(|v| format!("{} envies {} by {}", v.evaluator, v.owner, fmt_1dp(v.difference)))
            .collect::<Vec<_>>()
            .join("; ")
    };

    vec![
        PropertyLine {
            name: "proportional",
            pass: f.proportional.satisfied,
            detail: format!("every share worth at least {} to its owner", fmt_1dp(f.proportional.threshold)),
        },
        PropertyLine { name: "envy_free", pass: f.envy_free.satisfied, detail: envy_detail },
        PropertyLine {
            name: "equitable",
            pass: f.equitable.satisfied,
            detail: format!("largest gap between own values {}", fmt_1dp(f.equitable.max_difference)),
        },
        PropertyLine {
            name: "efficient",
            pass: f.efficiency.efficient,
            detail: format!(
                "{} of {} total utility ({})",
                fmt_1dp(f.efficiency.total_utility),
                fmt_1dp(f.efficiency.max_utility),
                pct_1dp(f.efficiency.percent)
            ),
        },
    ]
}

fn envy_block(result: &RunResult) -> Result<EnvyBlock, ReportError> {
    let players: Vec<&PlayerId> = result.allocation.players().collect();
    let matrix = &result.fairness.envy_free.matrix;
    let mut rows = Vec::with_capacity(players.len());
    for evaluator in &players {
        let mut cells = Vec::with_capacity(players.len());
        for owner in &players {
            let envies = matrix
                .get(*evaluator)
                .and_then(|row| row.get(*owner))
                .map_or(false, |e| e.envies);
            cells.push(EnvyCell {
                owner: owner.to_string(),
                value_1dp: fmt_1dp(value(result, evaluator, owner)?),
                envies,
            });
        }
        rows.push(EnvyRow { evaluator: evaluator.to_string(), cells });
    }
    Ok(EnvyBlock { players: players.iter().map(|p| p.to_string()).collect(), rows })
}

/// Build the report model from a recorded result.
pub fn build_model(result: &RunResult) -> Result<ReportModel, ReportError> {
    if result.id.is_empty() {
        return Err(ReportError::MissingField("id"));
    }
    if result.allocation.is_empty() {
        return Err(ReportError::MissingField("allocation"));
    }
    let f = &result.fairness;

    let passed = [f.proportional.satisfied, f.envy_free.satisfied, f.equitable.satisfied]
        .iter()
        .filter(|ok| **ok)
        .count();
    let verdict = match passed {
        3 => Verdict::Fair,
        0 => Verdict::Unfair,
        _ => Verdict::Partial,
    };

    let mut rows = Vec::with_capacity(result.allocation.len());
    for (player, share) in result.allocation.iter() {
        rows.push(AllocationRow {
            player: player.to_string(),
            share: describe_share(share),
            own_value_1dp: fmt_1dp(value(result, player, player)?),
            proportional: f.proportional.players.get(player).map_or(false, |p| p.satisfied),
        });
    }
    let leftover = match result.allocation.leftover() {
        [] => None,
        pieces => Some(describe_share(&Share::segments(pieces.to_vec()))),
    };

    Ok(ReportModel {
        summary: SummaryBlock {
            algorithm: result.algorithm.to_string(),
            algorithm_name: result.algorithm_name.clone(),
            player_count: result.player_count,
            verdict,
            score_pct_1dp: pct_1dp(f.score),
        },
        allocation: AllocationBlock { rows, leftover },
        properties: properties(result),
        envy: envy_block(result)?,
        integrity: IntegrityBlock {
            result_id: result.id.clone(),
            started_at: result.timing.started_at.clone(),
            finished_at: result.timing.finished_at.clone(),
            steps_entered: result.timing.steps_entered,
        },
    })
}
