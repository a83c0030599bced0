//! crates/fd_io/src/scenario.rs
//!
//! Scenario files: one JSON document naming the procedure, the board
//! (regions), every player's valuation, optional cuts and the params.
//!
//! ```json
//! {
//!   "algorithm": "divide-and-choose",
//!   "player_count": 2,
//!   "regions": [{"id": "blue", "shape": {"kind": "span", "start": 0, "end": 600}}],
//!   "players": {"P1": {"blue": 100}, "P2": {"blue": 100}},
//!   "cuts": [400],
//!   "params": {"axis_length": 800}
//! }
//! ```
//!
//! Loading checks structure only: geometry and params domains. Valuation
//! totals are checked later by the pipeline so that every problem can be
//! reported at once.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fd_core::variables::validate_domains;
use fd_core::{AlgorithmId, Cut, Params, Region, RegionSet, Valuations};

use crate::hasher::sha256_hex;
use crate::{IoError, IoResult};

/// Raw file shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub algorithm: AlgorithmId,
    pub player_count: usize,
    pub regions: Vec<Region>,
    pub players: Valuations,
    #[serde(default)]
    pub cuts: Vec<Cut>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// A loaded scenario with a validated region set.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub algorithm: AlgorithmId,
    pub player_count: usize,
    pub regions: RegionSet,
    pub players: Valuations,
    pub cuts: Vec<Cut>,
    pub params: Params,
    pub metadata: BTreeMap<String, Value>,
    /// sha256 of the file bytes as read.
    pub source_sha256: String,
}

pub fn parse_scenario(bytes: &[u8]) -> IoResult<Scenario> {
    let file: ScenarioFile = serde_json::from_slice(bytes)?;
    validate_domains(&file.params).map_err(|e| IoError::Invalid(format!("params: {e}")))?;
    let regions = RegionSet::new(file.regions).map_err(|e| IoError::Invalid(format!("regions: {e}")))?;
    for (player, valuation) in &file.players {
        if let Some((rid, _)) = valuation.iter().find(|(rid, _)| !regions.contains(rid)) {
            return Err(IoError::Invalid(format!("{player} values unknown region {rid}")));
        }
    }
    Ok(Scenario {
        algorithm: file.algorithm,
        player_count: file.player_count,
        regions,
        players: file.players,
        cuts: file.cuts,
        params: file.params,
        metadata: file.metadata,
        source_sha256: sha256_hex(bytes),
    })
}

pub fn load_scenario(path: &Path) -> IoResult<Scenario> {
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let scenario = parse_scenario(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        algorithm = %scenario.algorithm,
        regions = scenario.regions.len(),
        "scenario loaded"
    );
    Ok(scenario)
}
