//! crates/fd_io/src/snapshot.rs
//!
//! Session snapshot wire format: `{ version, playerValues, algorithmStates, metadata }`.
//!
//! - Export writes every key (canonical JSON).
//! - Import reads a *patch*: any subset of the top-level keys. Absent keys
//!   leave the session untouched; applying the patch is the session's job.
//! - A snapshot from a newer engine (`version > SNAPSHOT_VERSION`) is refused.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fd_core::{AlgorithmId, PlayerId, StepId, Valuation};

use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
use crate::{IoError, IoResult};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-procedure bookkeeping kept across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmState {
    #[serde(default)]
    pub runs: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_step: Option<StepId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub version: u32,
    pub player_values: BTreeMap<PlayerId, Valuation>,
    pub algorithm_states: BTreeMap<AlgorithmId, AlgorithmState>,
    pub metadata: BTreeMap<String, Value>,
}

/// Partial snapshot accepted on import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPatch {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub player_values: Option<BTreeMap<PlayerId, Valuation>>,
    #[serde(default)]
    pub algorithm_states: Option<BTreeMap<AlgorithmId, AlgorithmState>>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl From<SessionSnapshot> for SnapshotPatch {
    fn from(s: SessionSnapshot) -> Self {
        SnapshotPatch {
            version: Some(s.version),
            player_values: Some(s.player_values),
            algorithm_states: Some(s.algorithm_states),
            metadata: Some(s.metadata),
        }
    }
}

impl SnapshotPatch {
    /// True when no top-level key was present.
    pub fn is_empty(&self) -> bool {
        self.player_values.is_none() && self.algorithm_states.is_none() && self.metadata.is_none()
    }
}

pub fn snapshot_to_bytes(snapshot: &SessionSnapshot) -> IoResult<Vec<u8>> {
    to_canonical_bytes(snapshot)
}

/// Parse a (possibly partial) snapshot and check its version.
pub fn parse_snapshot_patch(bytes: &[u8]) -> IoResult<SnapshotPatch> {
    let patch: SnapshotPatch = serde_json::from_slice(bytes)?;
    if let Some(found) = patch.version {
        if found > SNAPSHOT_VERSION {
            return Err(IoError::Version { found, supported: SNAPSHOT_VERSION });
        }
    }
    Ok(patch)
}

pub fn write_snapshot_file(path: &Path, snapshot: &SessionSnapshot) -> IoResult<()> {
    write_canonical_file(path, snapshot)?;
    tracing::debug!(path = %path.display(), "snapshot written");
    Ok(())
}

pub fn read_snapshot_file(path: &Path) -> IoResult<SnapshotPatch> {
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_snapshot_patch(&bytes)
}
