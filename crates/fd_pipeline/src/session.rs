//! Session: the single explicit context shared by every component.
//!
//! Holds the board (through the calculation engine), the players'
//! valuations, the current cut positions, per-procedure bookkeeping and
//! free-form metadata. Passed by reference; there is no ambient instance.

use std::collections::BTreeMap;

use serde_json::Value;

use fd_algo::CalculationEngine;
use fd_core::{AlgorithmId, Cut, Params, PlayerId, RegionSet, Valuation, Valuations};
use fd_io::hasher::check_res_id;
use fd_io::scenario::Scenario;
use fd_io::snapshot::{AlgorithmState, SessionSnapshot, SnapshotPatch, SNAPSHOT_VERSION};
use fd_io::IoError;

use crate::DriverError;

/// Input collaborator: where valuations and cut positions come from.
///
/// Values handed out are expected to be in range already; nothing
/// downstream clamps them.
pub trait InputSource {
    fn player_values(&self, player: &PlayerId) -> Option<&Valuation>;
    fn cut_positions(&self) -> &[Cut];
}

#[derive(Debug)]
pub struct Session {
    engine: CalculationEngine,
    valuations: Valuations,
    cuts: Vec<Cut>,
    algorithm_states: BTreeMap<AlgorithmId, AlgorithmState>,
    metadata: BTreeMap<String, Value>,
}

impl Session {
    pub fn new(regions: RegionSet, params: Params) -> Self {
        Session {
            engine: CalculationEngine::new(regions, params),
            valuations: Valuations::new(),
            cuts: Vec::new(),
            algorithm_states: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut s = Session::new(scenario.regions.clone(), scenario.params.clone());
        s.valuations = scenario.players.clone();
        s.cuts = scenario.cuts.clone();
        s.metadata = scenario.metadata.clone();
        s
    }

    pub fn regions(&self) -> &RegionSet { self.engine.regions() }

    pub fn params(&self) -> &Params { self.engine.params() }

    pub fn engine(&self) -> &CalculationEngine { &self.engine }

    pub fn engine_mut(&mut self) -> &mut CalculationEngine { &mut self.engine }

    pub fn valuations(&self) -> &Valuations { &self.valuations }

    pub fn set_player_values(&mut self, player: PlayerId, valuation: Valuation) {
        self.valuations.insert(player, valuation);
    }

    pub fn set_cut_positions(&mut self, cuts: Vec<Cut>) {
        self.cuts = cuts;
    }

    pub fn algorithm_state(&self, id: &AlgorithmId) -> Option<&AlgorithmState> {
        self.algorithm_states.get(id)
    }

    pub fn algorithm_state_mut(&mut self, id: &AlgorithmId) -> &mut AlgorithmState {
        self.algorithm_states.entry(id.clone()).or_default()
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> { &self.metadata }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn export_state(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            player_values: self.valuations.clone(),
            algorithm_states: self.algorithm_states.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Applies the keys present in `patch`; absent keys are left untouched.
    /// Recorded result ids must be well-formed or nothing is applied.
    /// A successful import invalidates the calculation cache.
    pub fn import_state(&mut self, patch: SnapshotPatch) -> Result<(), DriverError> {
        if let Some(found) = patch.version {
            if found > SNAPSHOT_VERSION {
                return Err(IoError::Version { found, supported: SNAPSHOT_VERSION }.into());
            }
        }
        let SnapshotPatch { player_values, algorithm_states, metadata, .. } = patch;
        if let Some(states) = &algorithm_states {
            for id in states.values().filter_map(|a| a.last_result_id.as_deref()) {
                check_res_id(id)?;
            }
        }
        if let Some(v) = player_values {
            self.valuations = v;
        }
        if let Some(a) = algorithm_states {
            self.algorithm_states = a;
        }
        if let Some(m) = metadata {
            self.metadata = m;
        }
        self.engine.invalidate();
        tracing::debug!(players = self.valuations.len(), "session state imported");
        Ok(())
    }
}

impl InputSource for Session {
    fn player_values(&self, player: &PlayerId) -> Option<&Valuation> {
        self.valuations.get(player)
    }

    fn cut_positions(&self) -> &[Cut] {
        &self.cuts
    }
}
