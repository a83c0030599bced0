//! crates/fd_pipeline/src/machine.rs
//! The step-machine driver.
//!
//! A run is a single integer cursor over the configured steps plus an
//! implicit "not started" / "completed" pair. Every transition is a small
//! transaction:
//!
//! 1. the per-run data is cloned;
//! 2. exit and/or entry actions run against the clone and queue effects;
//! 3. effects are applied to the clone;
//! 4. only if all of that succeeded is the clone committed, the cursor
//!    moved, timers scheduled and events published.
//!
//! A failing action therefore leaves the cursor and the run data exactly
//! as they were; the failure is published as `ExecutionFailed`.
//!
//! Branching (e.g. Steinhaus case A/B) lives in the actions, which look at
//! the run data and pick what to do. The driver never follows edges.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use fd_algo::{split_point, CalcError, CalculationEngine, SplitPoint};
use fd_core::{
    AlgorithmId, Allocation, Cut, GeometryError, Params, Piece, PlayerId, RegionSet, Share, Span,
    StepId, Valuation, Valuations,
};

use crate::build_result::{build_run_result, Clock, ResultInputs, RunResult, SystemClock};
use crate::config::{AlgorithmConfig, AlgorithmStep};
use crate::operation::{apply, Operation, OperationKind};
use crate::schedule::Scheduler;
use crate::session::{InputSource, Session};
use crate::validate::{validate_inputs, Severity};
use crate::DriverError;

/* --------------------------------- Errors --------------------------------- */

/// Failure inside a step action or an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("no step is active")]
    NotRunning,
    #[error("operation `{op}` is not enabled in step {step}")]
    OperationDisabled { op: OperationKind, step: StepId },
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("missing input: {0}")]
    MissingInput(&'static str),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("calculation: {0}")]
    Calc(CalcError),
    #[error("{0}")]
    Failed(String),
}

impl From<CalcError> for StepError {
    fn from(e: CalcError) -> Self {
        match e {
            CalcError::Geometry(g) => StepError::Geometry(g),
            other => StepError::Calc(other),
        }
    }
}

/* ------------------------------- Run data -------------------------------- */

/// Everything a single run accumulates. Cleared by `reset`; the step
/// definitions are never touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunState {
    pub autoplay: bool,
    pub players: Vec<PlayerId>,
    pub valuations: Valuations,
    /// Cut positions supplied by the input collaborator before the run.
    pub preset_cuts: Vec<Cut>,
    /// The player who divides (or moves the knife), if the procedure has one.
    pub divider: Option<PlayerId>,
    /// Segments of the good currently being divided.
    pub cake: Vec<Piece>,
    pub cuts: Vec<Cut>,
    pub pieces: Vec<Piece>,
    /// Shares on offer after the latest cut or knife stop.
    pub candidates: Vec<Share>,
    /// Indices into `candidates` already selected.
    pub taken: BTreeSet<usize>,
    pub selections: BTreeMap<PlayerId, Share>,
    pub acceptable: BTreeMap<PlayerId, BTreeSet<usize>>,
    pub markers: BTreeMap<PlayerId, Vec<Cut>>,
    /// (left, right) knife positions once stopped.
    pub knives: Option<(f64, f64)>,
    pub allocation: Option<Allocation>,
    pub steps_entered: u32,
}

/* ------------------------------ Action surface ---------------------------- */

/// Read-only view handed to step actions, plus access to the engine for
/// (memoized) valuations.
pub struct StepCtx<'a> {
    pub config: &'a AlgorithmConfig,
    pub step_index: usize,
    pub state: &'a RunState,
    engine: &'a mut CalculationEngine,
}

impl<'a> StepCtx<'a> {
    pub fn step(&self) -> &'a AlgorithmStep {
        let config: &'a AlgorithmConfig = self.config;
        &config.steps[self.step_index]
    }

    pub fn params(&self) -> &Params {
        self.engine.params()
    }

    pub fn regions(&self) -> &RegionSet {
        self.engine.regions()
    }

    pub fn autoplay(&self) -> bool {
        self.state.autoplay
    }

    pub fn delay_ms(&self) -> u64 {
        self.engine.params().auto_advance_delay_ms
    }

    /// Seat `n` (1-based).
    pub fn player(&self, n: usize) -> Result<&'a PlayerId, StepError> {
        let state: &'a RunState = self.state;
        n.checked_sub(1)
            .and_then(|i| state.players.get(i))
            .ok_or(StepError::MissingInput("player seat"))
    }

    pub fn valuation(&self, player: &PlayerId) -> Result<&'a Valuation, StepError> {
        let state: &'a RunState = self.state;
        state.valuations.get(player).ok_or_else(|| StepError::UnknownPlayer(player.clone()))
    }

    /// The whole good as one segment.
    pub fn whole(&self) -> Piece {
        Span { start: 0.0, end: self.engine.params().axis_length }
    }

    pub fn share_value(&mut self, share: &Share, player: &PlayerId) -> Result<f64, StepError> {
        let valuation = self.valuation(player)?;
        Ok(self.engine.share_value(share, valuation)?)
    }

    pub fn piece_value(&mut self, piece: &Piece, player: &PlayerId) -> Result<f64, StepError> {
        let valuation = self.valuation(player)?;
        Ok(self.engine.piece_value(piece, valuation)?)
    }

    /// Where along `segments` the prefix becomes worth `target` to `player`.
    pub fn split_point(&self, segments: &[Piece], player: &PlayerId, target: f64) -> Result<SplitPoint, StepError> {
        let valuation = self.valuation(player)?;
        Ok(split_point(segments, self.engine.regions(), valuation, target)?)
    }
}

/// Instruction queued by a step action.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Notice(String),
    Perform(Operation),
    /// Advance once `delay_ms` of virtual time has passed, if still on this step.
    AdvanceAfter(u64),
    /// Restrict the good in play to these segments; clears cuts and candidates.
    SetCake(Vec<Piece>),
    /// Terminal allocation of the run; recording it produces the result.
    Finish(Allocation),
}

#[derive(Debug, Default)]
pub struct StepApi {
    effects: Vec<Effect>,
}

impl StepApi {
    pub fn notice(&mut self, message: impl Into<String>) {
        self.effects.push(Effect::Notice(message.into()));
    }

    pub fn perform(&mut self, op: Operation) {
        self.effects.push(Effect::Perform(op));
    }

    pub fn advance_after(&mut self, delay_ms: u64) {
        self.effects.push(Effect::AdvanceAfter(delay_ms));
    }

    pub fn set_cake(&mut self, segments: Vec<Piece>) {
        self.effects.push(Effect::SetCake(segments));
    }

    pub fn finish(&mut self, allocation: Allocation) {
        self.effects.push(Effect::Finish(allocation));
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }
}

/* -------------------------------- Events --------------------------------- */

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    StepEntered { step_index: usize, step_id: StepId, title: String, instructions: String },
    StepExited { step_index: usize, step_id: StepId },
    Notice { step_index: usize, message: String },
    ExecutionFailed { step_index: usize, step_id: StepId, message: String },
    Completed { algorithm: AlgorithmId, result_id: Option<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Active(usize),
    Completed,
}

/* -------------------------------- Machine -------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Which {
    Enter,
    Exit,
}

/// Pending auto-advance, valid only while the cursor is still on `from_step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AdvanceTask {
    from_step: usize,
}

#[derive(Default)]
struct Tx {
    events: Vec<DriverEvent>,
    timers: Vec<u64>,
    finish: Option<Allocation>,
}

/// Upper bound on tasks fired by one `flush`.
const MAX_FLUSH_TASKS: usize = 1024;

pub struct StepMachine {
    config: AlgorithmConfig,
    phase: Phase,
    run: RunState,
    autoplay: bool,
    scheduler: Scheduler<AdvanceTask>,
    events: Vec<DriverEvent>,
    result: Option<RunResult>,
    clock: Box<dyn Clock>,
    started_at: Option<DateTime<Utc>>,
    /// Step whose exit action already ran while the cursor stayed on it.
    exited: Option<usize>,
}

impl std::fmt::Debug for StepMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepMachine")
            .field("algorithm", &self.config.id)
            .field("phase", &self.phase)
            .field("pending_tasks", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}

fn check_inputs<S: InputSource + ?Sized>(config: &AlgorithmConfig, source: &S, session: &Session) -> Result<(), DriverError> {
    let report = validate_inputs(source, config.player_count, session.regions(), session.params());
    for w in report.warnings() {
        warn!(algorithm = %config.id, "{w}");
    }
    if report.pass {
        Ok(())
    } else {
        let errors: Vec<_> = report.issues.into_iter().filter(|i| i.severity == Severity::Error).collect();
        warn!(algorithm = %config.id, count = errors.len(), "input validation failed");
        Err(DriverError::Validation(errors))
    }
}

impl StepMachine {
    /// Checks the configuration and the session's valuations. Nothing runs
    /// until [`StepMachine::start`].
    pub fn initialize(config: AlgorithmConfig, session: &Session) -> Result<Self, DriverError> {
        config.validate()?;
        check_inputs(&config, session, session)?;
        debug!(algorithm = %config.id, steps = config.steps.len(), "step machine initialized");
        Ok(StepMachine {
            config,
            phase: Phase::NotStarted,
            run: RunState::default(),
            autoplay: false,
            scheduler: Scheduler::new(),
            events: Vec::new(),
            result: None,
            clock: Box::new(SystemClock),
            started_at: None,
            exited: None,
        })
    }

    /// Replaces the configuration; pending transitions of the old run are dropped.
    pub fn reinitialize(&mut self, config: AlgorithmConfig, session: &Session) -> Result<(), DriverError> {
        config.validate()?;
        check_inputs(&config, session, session)?;
        let dropped = self.scheduler.cancel_all();
        debug!(from = %self.config.id, to = %config.id, dropped, "step machine re-initialized");
        self.config = config;
        self.phase = Phase::NotStarted;
        self.run = RunState::default();
        self.result = None;
        self.started_at = None;
        self.exited = None;
        Ok(())
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &AlgorithmConfig { &self.config }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn run(&self) -> &RunState { &self.run }

    pub fn result(&self) -> Option<&RunResult> { self.result.as_ref() }

    pub fn pending_tasks(&self) -> usize { self.scheduler.pending() }

    pub fn now_ms(&self) -> u64 { self.scheduler.now_ms() }

    pub fn current_step(&self) -> Option<&AlgorithmStep> {
        match self.phase {
            Phase::Active(i) => self.config.steps.get(i),
            _ => None,
        }
    }

    /// Events published since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<DriverEvent> {
        std::mem::take(&mut self.events)
    }

    /// Loads the inputs into fresh run data, runs the init hook and enters
    /// the first step. A no-op unless the machine is "not started".
    pub fn start(&mut self, session: &mut Session) -> Result<Phase, DriverError> {
        if self.phase != Phase::NotStarted {
            return Ok(self.phase);
        }
        check_inputs(&self.config, &*session, session)?;

        let players: Vec<PlayerId> = (1..=self.config.player_count).map(PlayerId::numbered).collect();
        let valuations: Valuations = players
            .iter()
            .filter_map(|p| session.player_values(p).map(|v| (p.clone(), v.clone())))
            .collect();
        let mut run = RunState {
            autoplay: self.autoplay,
            players,
            valuations,
            preset_cuts: session.cut_positions().to_vec(),
            cake: vec![Span { start: 0.0, end: session.params().axis_length }],
            ..RunState::default()
        };
        (self.config.hooks.on_init)(&mut run);
        self.run = run;
        self.started_at = Some(self.clock.now());
        info!(algorithm = %self.config.id, autoplay = self.autoplay, "run started");
        self.transition(session, None, Some(0))
    }

    /// Runs the entry action of `index` and makes it the active step.
    /// Only valid while a step is active; a completed run stays completed.
    pub fn enter_step(&mut self, session: &mut Session, index: usize) -> Result<Phase, DriverError> {
        if index >= self.config.steps.len() {
            return Err(StepError::InvalidOperation(format!("no step {index}")).into());
        }
        if !matches!(self.phase, Phase::Active(_)) {
            return Err(StepError::NotRunning.into());
        }
        self.transition(session, None, Some(index))
    }

    /// Runs the exit action of the active step without moving the cursor.
    /// The action runs once: a later `advance` off this step skips it.
    pub fn exit_step(&mut self, session: &mut Session) -> Result<Phase, DriverError> {
        match self.phase {
            Phase::Active(i) => {
                let phase = self.transition(session, Some(i), None)?;
                Ok(phase)
            }
            _ => Err(StepError::NotRunning.into()),
        }
    }

    /// exit(current) then enter(current + 1), or completion after the last
    /// step. Once completed, further calls are no-ops.
    pub fn advance(&mut self, session: &mut Session) -> Result<Phase, DriverError> {
        match self.phase {
            Phase::NotStarted => self.start(session),
            Phase::Active(i) if i + 1 < self.config.steps.len() => {
                self.commit(session, Some(i), Some(i + 1), Phase::Active(i + 1))
            }
            Phase::Active(i) => self.commit(session, Some(i), None, Phase::Completed),
            Phase::Completed => {
                debug!(algorithm = %self.config.id, "advance after completion ignored");
                Ok(Phase::Completed)
            }
        }
    }

    /// Applies a player operation if the active step enables it.
    pub fn perform(&mut self, session: &mut Session, op: Operation) -> Result<(), DriverError> {
        let Phase::Active(i) = self.phase else {
            return Err(StepError::NotRunning.into());
        };
        let step = &self.config.steps[i];
        let kind = op.kind();
        if !step.allows(kind) {
            warn!(algorithm = %self.config.id, step = %step.id, op = %kind, "operation rejected");
            return Err(StepError::OperationDisabled { op: kind, step: step.id.clone() }.into());
        }
        let mut staged = self.run.clone();
        if let Err(e) = apply(op, &mut staged, session.engine()) {
            warn!(algorithm = %self.config.id, step = %step.id, op = %kind, error = %e, "operation failed");
            return Err(e.into());
        }
        self.run = staged;
        Ok(())
    }

    /// Stores `allocation`, analyzes it and produces the run's result.
    /// A run records at most one result.
    pub fn record_result(&mut self, session: &mut Session, allocation: Allocation) -> Result<&RunResult, DriverError> {
        if self.result.is_some() {
            return Err(DriverError::AlreadyRecorded);
        }
        let result = self.build_result(session, &self.run.valuations.clone(), self.run.steps_entered, &allocation)?;
        self.run.allocation = Some(allocation);
        self.store_result(session, result);
        self.result.as_ref().ok_or(DriverError::AlreadyRecorded)
    }

    /// Back to "not started": pending transitions are cancelled, per-run
    /// data is cleared and the reset hook runs. Steps are untouched.
    pub fn reset(&mut self) -> usize {
        let cancelled = self.scheduler.cancel_all();
        let mut run = RunState::default();
        (self.config.hooks.on_reset)(&mut run);
        self.run = run;
        self.phase = Phase::NotStarted;
        self.result = None;
        self.started_at = None;
        self.exited = None;
        debug!(algorithm = %self.config.id, cancelled, "run reset");
        cancelled
    }

    /// Fires every task due at `now_ms` (virtual). Returns how many fired.
    pub fn tick(&mut self, session: &mut Session, now_ms: u64) -> Result<usize, DriverError> {
        let mut fired = 0;
        while let Some(task) = self.scheduler.pop_due(now_ms) {
            fired += 1;
            self.fire(session, task)?;
        }
        Ok(fired)
    }

    /// Fires pending tasks in due order until none are left.
    pub fn flush(&mut self, session: &mut Session) -> Result<usize, DriverError> {
        let mut fired = 0;
        while let Some(task) = self.scheduler.pop_next() {
            fired += 1;
            self.fire(session, task)?;
            if fired >= MAX_FLUSH_TASKS {
                warn!(algorithm = %self.config.id, fired, "flush stopped: task limit reached");
                break;
            }
        }
        Ok(fired)
    }

    fn fire(&mut self, session: &mut Session, task: AdvanceTask) -> Result<(), DriverError> {
        if self.phase != Phase::Active(task.from_step) {
            debug!(from_step = task.from_step, "stale auto-advance skipped");
            return Ok(());
        }
        self.advance(session).map(|_| ())
    }

    /* ---------------------------- transactions ---------------------------- */

    fn transition(&mut self, session: &mut Session, exit: Option<usize>, enter: Option<usize>) -> Result<Phase, DriverError> {
        let target = match enter {
            Some(j) => Phase::Active(j),
            None => self.phase,
        };
        self.commit(session, exit, enter, target)
    }

    fn commit(
        &mut self,
        session: &mut Session,
        exit: Option<usize>,
        enter: Option<usize>,
        target: Phase,
    ) -> Result<Phase, DriverError> {
        let mut staged = self.run.clone();
        let mut tx = Tx::default();

        if let Some(i) = exit.filter(|i| self.exited != Some(*i)) {
            if let Err(e) = self.run_action(session, &mut staged, i, Which::Exit, &mut tx) {
                return Err(self.fail(i, e));
            }
            let step_id = self.config.steps[i].id.clone();
            debug!(algorithm = %self.config.id, step = %step_id, "step exited");
            tx.events.push(DriverEvent::StepExited { step_index: i, step_id });
        }
        if let Some(j) = enter {
            let step = &self.config.steps[j];
            tx.events.push(DriverEvent::StepEntered {
                step_index: j,
                step_id: step.id.clone(),
                title: step.title.clone(),
                instructions: step.instructions.clone(),
            });
            staged.steps_entered += 1;
            if let Err(e) = self.run_action(session, &mut staged, j, Which::Enter, &mut tx) {
                return Err(self.fail(j, e));
            }
            debug!(algorithm = %self.config.id, step = %self.config.steps[j].id, "step entered");
        }

        let mut result = None;
        if let Some(allocation) = tx.finish.take() {
            let at = enter.or(exit).unwrap_or(0);
            if self.result.is_some() {
                return Err(self.fail(at, StepError::InvalidOperation("result already recorded".into())));
            }
            match self.build_result(session, &staged.valuations, staged.steps_entered, &allocation) {
                Ok(r) => result = Some(r),
                Err(DriverError::StepExecution(e)) => return Err(self.fail(at, e)),
                Err(other) => return Err(other),
            }
            staged.allocation = Some(allocation);
        }

        // commit
        self.exited = match (exit, enter) {
            (Some(i), None) if target == Phase::Active(i) => Some(i),
            _ => None,
        };
        self.run = staged;
        self.phase = target;
        self.events.append(&mut tx.events);
        if let Phase::Active(j) = target {
            for delay in tx.timers.drain(..) {
                self.scheduler.schedule(delay, AdvanceTask { from_step: j });
            }
        }
        if let Some(r) = result {
            self.store_result(session, r);
        }
        if let Phase::Active(j) = target {
            session.algorithm_state_mut(&self.config.id).last_step = Some(self.config.steps[j].id.clone());
        }
        if target == Phase::Completed {
            self.complete(session);
        }
        Ok(self.phase)
    }

    fn run_action(
        &self,
        session: &mut Session,
        staged: &mut RunState,
        index: usize,
        which: Which,
        tx: &mut Tx,
    ) -> Result<(), StepError> {
        let step = &self.config.steps[index];
        let action = match which {
            Which::Enter => step.on_enter,
            Which::Exit => step.on_exit,
        };

        let mut api = StepApi::default();
        {
            let mut ctx = StepCtx { config: &self.config, step_index: index, state: &*staged, engine: session.engine_mut() };
            action(&mut ctx, &mut api)?;
        }

        for effect in api.effects {
            match effect {
                Effect::Notice(message) => tx.events.push(DriverEvent::Notice { step_index: index, message }),
                Effect::Perform(op) => {
                    let kind = op.kind();
                    if !step.allows(kind) {
                        return Err(StepError::OperationDisabled { op: kind, step: step.id.clone() });
                    }
                    apply(op, staged, session.engine())?;
                }
                Effect::AdvanceAfter(delay) => tx.timers.push(delay),
                Effect::SetCake(segments) => {
                    for s in &segments {
                        s.check_piece()?;
                    }
                    staged.cake = segments;
                    staged.cuts.clear();
                    staged.pieces.clear();
                    staged.candidates.clear();
                    staged.taken.clear();
                    staged.acceptable.clear();
                }
                Effect::Finish(allocation) => {
                    if tx.finish.is_some() {
                        return Err(StepError::InvalidOperation("allocation finished twice".into()));
                    }
                    tx.finish = Some(allocation);
                }
            }
        }
        Ok(())
    }

    /// Publishes a caught action failure. Geometry errors are not caught:
    /// they are returned as-is without an event.
    fn fail(&mut self, index: usize, err: StepError) -> DriverError {
        let step = &self.config.steps[index];
        match err {
            StepError::Geometry(g) => DriverError::Geometry(g),
            other => {
                warn!(algorithm = %self.config.id, step = %step.id, error = %other, "step action failed");
                self.events.push(DriverEvent::ExecutionFailed {
                    step_index: index,
                    step_id: step.id.clone(),
                    message: other.to_string(),
                });
                DriverError::StepExecution(other)
            }
        }
    }

    fn build_result(
        &self,
        session: &mut Session,
        valuations: &Valuations,
        steps_entered: u32,
        allocation: &Allocation,
    ) -> Result<RunResult, DriverError> {
        let engine = session.engine_mut();
        let values = engine.value_matrix(allocation, valuations).map_err(StepError::from)?;
        let fairness = fd_algo::analyze_fairness(allocation, &values, self.config.player_count, engine.params())
            .map_err(|e| StepError::from(CalcError::from(e)))?;
        let finished_at = self.clock.now();
        let started_at = self.started_at.unwrap_or(finished_at);
        Ok(build_run_result(ResultInputs {
            algorithm: self.config.id.clone(),
            algorithm_name: self.config.name.clone(),
            player_count: self.config.player_count,
            started_at,
            finished_at,
            steps_entered,
            allocation: allocation.clone(),
            values,
            fairness,
        })?)
    }

    fn store_result(&mut self, session: &mut Session, result: RunResult) {
        info!(
            algorithm = %result.algorithm,
            id = %result.id,
            score = result.fairness.score,
            "result recorded"
        );
        let state = session.algorithm_state_mut(&self.config.id);
        state.runs += 1;
        state.last_result_id = Some(result.id.clone());
        self.result = Some(result);
    }

    fn complete(&mut self, session: &mut Session) {
        let result_id = self.result.as_ref().map(|r| r.id.clone());
        session.algorithm_state_mut(&self.config.id).completed = true;
        let dropped = self.scheduler.cancel_all();
        info!(algorithm = %self.config.id, result = ?result_id, dropped, "run completed");
        self.events.push(DriverEvent::Completed { algorithm: self.config.id.clone(), result_id });
    }
}
