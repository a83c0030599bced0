//! build_result.rs: assemble the immutable `RunResult` of a finished run.
//!
//! The id is `RES:<sha256>` over the canonical JSON of the id-less payload,
//! so two runs with identical inputs, allocation and timestamps share an id.
//! Timestamps come from a [`Clock`] so tests can pin them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use fd_algo::{FairnessReport, ValueMatrix};
use fd_core::{AlgorithmId, Allocation};
use fd_io::hasher::res_id_from_canonical;
use fd_io::IoError;

/// Source of wall-clock time for result metadata.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// RFC3339 UTC, whole seconds, `Z` suffix.
pub fn format_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: String,
    pub finished_at: String,
    pub steps_entered: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub id: String,
    pub algorithm: AlgorithmId,
    pub algorithm_name: String,
    pub player_count: usize,
    pub timing: Timing,
    pub allocation: Allocation,
    /// `values[p][q]`: value to `p` of the share held by `q`.
    pub values: ValueMatrix,
    pub fairness: FairnessReport,
}

#[derive(Debug, Clone)]
pub struct ResultInputs {
    pub algorithm: AlgorithmId,
    pub algorithm_name: String,
    pub player_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps_entered: u32,
    pub allocation: Allocation,
    pub values: ValueMatrix,
    pub fairness: FairnessReport,
}

#[derive(Serialize)]
struct ResultNoId<'a> {
    algorithm: &'a AlgorithmId,
    algorithm_name: &'a str,
    player_count: usize,
    timing: &'a Timing,
    allocation: &'a Allocation,
    values: &'a ValueMatrix,
    fairness: &'a FairnessReport,
}

pub fn build_run_result(inputs: ResultInputs) -> Result<RunResult, IoError> {
    let timing = Timing {
        started_at: format_utc(inputs.started_at),
        finished_at: format_utc(inputs.finished_at),
        steps_entered: inputs.steps_entered,
    };
    let id = res_id_from_canonical(&ResultNoId {
        algorithm: &inputs.algorithm,
        algorithm_name: &inputs.algorithm_name,
        player_count: inputs.player_count,
        timing: &timing,
        allocation: &inputs.allocation,
        values: &inputs.values,
        fairness: &inputs.fairness,
    })?;
    Ok(RunResult {
        id,
        algorithm: inputs.algorithm,
        algorithm_name: inputs.algorithm_name,
        player_count: inputs.player_count,
        timing,
        allocation: inputs.allocation,
        values: inputs.values,
        fairness: inputs.fairness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fd_algo::analyze_fairness;
    use fd_core::{Params, PlayerId, Share, Span};

    fn inputs(finished_sec: u32) -> ResultInputs {
        let p1 = PlayerId::numbered(1);
        let p2 = PlayerId::numbered(2);
        let allocation: Allocation = [
            (p1.clone(), Share::piece(Span { start: 0.0, end: 400.0 })),
            (p2.clone(), Share::piece(Span { start: 400.0, end: 800.0 })),
        ]
        .into_iter()
        .collect();
        let values: ValueMatrix = [
            (p1.clone(), [(p1.clone(), 50.0), (p2.clone(), 50.0)].into_iter().collect()),
            (p2.clone(), [(p1, 40.0), (p2, 60.0)].into_iter().collect()),
        ]
        .into_iter()
        .collect();
        let fairness = analyze_fairness(&allocation, &values, 2, &Params::default()).unwrap();
        ResultInputs {
            algorithm: "divide-and-choose".parse().unwrap(),
            algorithm_name: "Divide and Choose".into(),
            player_count: 2,
            started_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, finished_sec).unwrap(),
            steps_entered: 3,
            allocation,
            values,
            fairness,
        }
    }

    #[test]
    fn id_is_stable_for_identical_inputs() {
        let a = build_run_result(inputs(5)).unwrap();
        let b = build_run_result(inputs(5)).unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("RES:"));
        assert_eq!(a.id.len(), 4 + 64);
        assert_eq!(a.timing.finished_at, "2025-01-01T12:00:05Z");
    }

    #[test]
    fn id_changes_with_content() {
        let a = build_run_result(inputs(5)).unwrap();
        let b = build_run_result(inputs(6)).unwrap();
        assert_ne!(a.id, b.id);
    }
}
