//! crates/fd_io/src/lib.rs
//! Single I/O crate of the engine.
//!
//! - Canonical JSON bytes (sorted keys, compact) and atomic file writes.
//! - SHA-256 content ids (`RES:<hex64>`).
//! - Session snapshot export/import (`{ version, playerValues, algorithmStates, metadata }`).
//! - Scenario files: regions, valuations, algorithm selection and params.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for fd_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors.
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json {
        pointer: String,
        msg: String,
    },

    #[error("hash error: {0}")]
    Hash(String),

    /// Snapshot written by a newer engine.
    #[error("unsupported snapshot version {found} (supported up to {supported})")]
    Version { found: u32, supported: u32 },

    /// Well-formed JSON with invalid content (geometry, params, ids).
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps line/column, not a pointer; default to root.
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod snapshot;
pub mod scenario;

pub mod prelude {
    pub use crate::{IoError, IoResult};
    pub use crate::canonical_json::{to_canonical_bytes, write_canonical_file};
    pub use crate::hasher::{res_id_from_canonical, sha256_hex};
    pub use crate::scenario::{load_scenario, parse_scenario, Scenario};
    pub use crate::snapshot::{AlgorithmState, SessionSnapshot, SnapshotPatch, SNAPSHOT_VERSION};
}
