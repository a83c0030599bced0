//! crates/fd_pipeline/src/config.rs
//! Static description of a procedure: ordered steps, the operations each
//! step enables, entry/exit actions and run hooks.
//!
//! Every optional member has a no-op default, so the driver always calls
//! through the table and never checks whether a callback exists.

use std::collections::BTreeSet;
use std::fmt;

use fd_core::{AlgorithmId, StepId};
use thiserror::Error;

use crate::machine::{RunState, StepApi, StepCtx, StepError};
use crate::operation::OperationKind;

/// Lowest and highest supported player counts.
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// Entry/exit action: reads the context, queues effects on the api.
pub type StepAction = fn(&mut StepCtx<'_>, &mut StepApi) -> Result<(), StepError>;

/// Run-level hook over the per-run data.
pub type RunHook = fn(&mut RunState);

pub fn noop_action(_ctx: &mut StepCtx<'_>, _api: &mut StepApi) -> Result<(), StepError> {
    Ok(())
}

pub fn noop_hook(_run: &mut RunState) {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid algorithm id: {0:?}")]
    InvalidId(String),
    #[error("invalid step id: {0:?}")]
    InvalidStepId(String),
    #[error("algorithm {0} has no name")]
    MissingName(AlgorithmId),
    #[error("algorithm {0} declares no steps")]
    NoSteps(AlgorithmId),
    #[error("algorithm {id}: player count {count} outside 2..=4")]
    PlayerCountOutOfRange { id: AlgorithmId, count: usize },
    #[error("algorithm {id}: duplicate step id {step}")]
    DuplicateStep { id: AlgorithmId, step: StepId },
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("algorithm {id} does not support {count} players")]
    PlayerCountMismatch { id: AlgorithmId, count: usize },
    #[error("algorithm {0} is already registered")]
    AlreadyRegistered(AlgorithmId),
}

#[derive(Clone)]
pub struct AlgorithmStep {
    pub id: StepId,
    pub title: String,
    pub instructions: String,
    pub enabled: Vec<OperationKind>,
    pub on_enter: StepAction,
    pub on_exit: StepAction,
}

impl AlgorithmStep {
    pub fn new(id: &str, title: impl Into<String>) -> Result<Self, ConfigError> {
        let id: StepId = id.parse().map_err(|_| ConfigError::InvalidStepId(id.to_string()))?;
        Ok(AlgorithmStep {
            id,
            title: title.into(),
            instructions: String::new(),
            enabled: Vec::new(),
            on_enter: noop_action,
            on_exit: noop_action,
        })
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = text.into();
        self
    }

    pub fn enable(mut self, ops: &[OperationKind]) -> Self {
        self.enabled.extend_from_slice(ops);
        self
    }

    pub fn on_enter(mut self, action: StepAction) -> Self {
        self.on_enter = action;
        self
    }

    pub fn on_exit(mut self, action: StepAction) -> Self {
        self.on_exit = action;
        self
    }

    pub fn allows(&self, kind: OperationKind) -> bool {
        self.enabled.contains(&kind)
    }
}

impl fmt::Debug for AlgorithmStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmStep")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
pub struct Hooks {
    /// Runs once per `start`, after the inputs are loaded.
    pub on_init: RunHook,
    /// Runs on `reset`, after the per-run data is cleared.
    pub on_reset: RunHook,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks { on_init: noop_hook, on_reset: noop_hook }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hooks")
    }
}

#[derive(Clone, Debug)]
pub struct AlgorithmConfig {
    pub id: AlgorithmId,
    pub name: String,
    pub player_count: usize,
    pub steps: Vec<AlgorithmStep>,
    pub hooks: Hooks,
}

impl AlgorithmConfig {
    pub fn new(id: &str, name: impl Into<String>, player_count: usize) -> Result<Self, ConfigError> {
        let id: AlgorithmId = id.parse().map_err(|_| ConfigError::InvalidId(id.to_string()))?;
        Ok(AlgorithmConfig {
            id,
            name: name.into(),
            player_count,
            steps: Vec::new(),
            hooks: Hooks::default(),
        })
    }

    pub fn step(mut self, step: AlgorithmStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Required fields and ranges. Nothing is registered or run on error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName(self.id.clone()));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            return Err(ConfigError::PlayerCountOutOfRange { id: self.id.clone(), count: self.player_count });
        }
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps(self.id.clone()));
        }
        let mut seen = BTreeSet::new();
        for s in &self.steps {
            if !seen.insert(&s.id) {
                return Err(ConfigError::DuplicateStep { id: self.id.clone(), step: s.id.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_steps() -> AlgorithmConfig {
        AlgorithmConfig::new("demo", "Demo", 2)
            .unwrap()
            .step(AlgorithmStep::new("one", "One").unwrap())
            .step(AlgorithmStep::new("two", "Two").unwrap().enable(&[OperationKind::Cut]))
    }

    #[test]
    fn well_formed_config_passes() {
        let c = two_steps();
        assert_eq!(c.validate(), Ok(()));
        assert!(c.steps[1].allows(OperationKind::Cut));
        assert!(!c.steps[0].allows(OperationKind::Cut));
    }

    #[test]
    fn missing_fields_are_configuration_errors() {
        assert_eq!(AlgorithmConfig::new("bad id", "x", 2).unwrap_err(), ConfigError::InvalidId("bad id".into()));

        let mut c = two_steps();
        c.name = " ".into();
        assert!(matches!(c.validate(), Err(ConfigError::MissingName(_))));

        let mut c = two_steps();
        c.player_count = 5;
        assert!(matches!(c.validate(), Err(ConfigError::PlayerCountOutOfRange { count: 5, .. })));
        c.player_count = 1;
        assert!(matches!(c.validate(), Err(ConfigError::PlayerCountOutOfRange { count: 1, .. })));

        let mut c = two_steps();
        c.steps.clear();
        assert!(matches!(c.validate(), Err(ConfigError::NoSteps(_))));

        let c = two_steps().step(AlgorithmStep::new("one", "Again").unwrap());
        assert!(matches!(c.validate(), Err(ConfigError::DuplicateStep { .. })));
    }
}
