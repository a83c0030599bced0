// crates/fd_pipeline/src/lib.rs
//! fd_pipeline: the session context, the step-machine driver and the
//! concrete fair-division procedures.
//!
//! Flow for a scenario: `Session::from_scenario` → `AlgorithmRegistry::config`
//! → `StepMachine::initialize` (validation) → `start` → `advance`/`tick`
//! until completed → the recorded `RunResult`.

#![forbid(unsafe_code)]

use thiserror::Error;
use tracing::info;

use fd_core::{GeometryError, StepId};
use fd_io::scenario::Scenario;
use fd_io::IoError;

pub mod config;
pub mod operation;
pub mod schedule;
pub mod session;
pub mod validate;
pub mod machine;
pub mod build_result;
pub mod algorithms;

pub use algorithms::{AlgorithmEntry, AlgorithmRegistry};
pub use build_result::{Clock, FixedClock, RunResult, SystemClock, Timing};
pub use config::{AlgorithmConfig, AlgorithmStep, ConfigError, Hooks, MAX_PLAYERS, MIN_PLAYERS};
pub use machine::{DriverEvent, Phase, RunState, StepApi, StepCtx, StepError, StepMachine};
pub use operation::{Operation, OperationKind};
pub use session::{InputSource, Session};
pub use validate::{validate_inputs, EntityRef, Severity, ValidationIssue, ValidationReport};

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues".into(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
    }
}

/// Errors surfaced by the driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("input validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("step execution failed: {0}")]
    StepExecution(StepError),
    #[error("a result was already recorded for this run")]
    AlreadyRecorded,
    #[error("run stopped before completion (last step: {})", .0.as_ref().map(|s| s.as_str()).unwrap_or("none"))]
    Stalled(Option<StepId>),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<StepError> for DriverError {
    fn from(e: StepError) -> Self {
        match e {
            StepError::Geometry(g) => DriverError::Geometry(g),
            other => DriverError::StepExecution(other),
        }
    }
}

/// What an autoplayed scenario run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: RunResult,
    pub events: Vec<DriverEvent>,
    pub session: Session,
}

/// Runs `scenario` start to finish with autoplay and the system clock.
pub fn run_scenario(scenario: &Scenario, registry: &AlgorithmRegistry) -> Result<RunOutcome, DriverError> {
    run_scenario_with_clock(scenario, registry, SystemClock)
}

pub fn run_scenario_with_clock(
    scenario: &Scenario,
    registry: &AlgorithmRegistry,
    clock: impl Clock + 'static,
) -> Result<RunOutcome, DriverError> {
    let config = registry.config(&scenario.algorithm, scenario.player_count)?;
    let mut session = Session::from_scenario(scenario);
    let mut machine = StepMachine::initialize(config, &session)?.with_autoplay(true).with_clock(clock);

    machine.start(&mut session)?;
    machine.flush(&mut session)?;

    if machine.phase() != Phase::Completed {
        let last = machine.current_step().map(|s| s.id.clone());
        return Err(DriverError::Stalled(last));
    }
    let result = machine.result().cloned().ok_or(DriverError::Stalled(None))?;
    info!(algorithm = %result.algorithm, id = %result.id, "scenario run finished");
    Ok(RunOutcome { result, events: machine.drain_events(), session })
}
