// crates/fd_cli/src/args.rs
//
// Argument surface of the `fd` binary (clap derive) plus the local-path
// checks applied before anything is read.
//
// - Scenario files are local paths; `scheme://` URLs are refused.
// - `run` renders to stdout unless `--out` is given.
// - `--snapshot` writes the session snapshot after the run.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "fd",
    version,
    disable_help_subcommand = true,
    about = "Offline, deterministic runner for fair-division procedures"
)]
pub struct Args {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load a scenario and check the algorithm choice and every valuation.
    Validate {
        scenario: PathBuf,
    },
    /// Autoplay the scenario's algorithm to completion and render the result.
    Run {
        scenario: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderFormat::Text)]
        render: RenderFormat,
        /// Write the rendered report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the session snapshot (canonical JSON) after the run.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// List the registered procedures.
    Algorithms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Json,
    Text,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ArgError {
    NonLocalPath(PathBuf),
    NotAFile(PathBuf),
    SamePath(&'static str),
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::NonLocalPath(p) => write!(f, "not a local path: {}", p.display()),
            ArgError::NotAFile(p) => write!(f, "no such file: {}", p.display()),
            ArgError::SamePath(what) => write!(f, "{what} must differ from the scenario path"),
        }
    }
}

impl std::error::Error for ArgError {}

fn looks_networked(p: &Path) -> bool {
    p.to_str().map_or(false, |s| s.contains("://"))
}

fn check_input(p: &Path) -> Result<(), ArgError> {
    if looks_networked(p) {
        return Err(ArgError::NonLocalPath(p.to_path_buf()));
    }
    if !p.is_file() {
        return Err(ArgError::NotAFile(p.to_path_buf()));
    }
    Ok(())
}

fn check_output(p: &Path, scenario: &Path, what: &'static str) -> Result<(), ArgError> {
    if looks_networked(p) {
        return Err(ArgError::NonLocalPath(p.to_path_buf()));
    }
    if p == scenario {
        return Err(ArgError::SamePath(what));
    }
    Ok(())
}

impl Args {
    /// Path checks clap cannot express.
    pub fn validate(&self) -> Result<(), ArgError> {
        match &self.command {
            Command::Validate { scenario } => check_input(scenario),
            Command::Run { scenario, out, snapshot, .. } => {
                check_input(scenario)?;
                if let Some(o) = out {
                    check_output(o, scenario, "--out")?;
                }
                if let Some(s) = snapshot {
                    check_output(s, scenario, "--snapshot")?;
                }
                Ok(())
            }
            Command::Algorithms => Ok(()),
        }
    }
}
