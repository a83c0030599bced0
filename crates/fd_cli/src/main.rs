// crates/fd_cli/src/main.rs
//
// `fd`: stable exit codes, logging setup, and the three subcommands.
// Rendered reports go to stdout (or --out); diagnostics go to stderr.

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    /// Scenario shape, algorithm choice or valuations rejected.
    pub const VALIDATION: u8 = 2;
    /// A step action failed or the run stopped early.
    pub const STEP: u8 = 3;
    pub const IO: u8 = 4;
    pub const GEOMETRY: u8 = 5;
}

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use args::{Args, Command, RenderFormat};
use fd_io::canonical_json::write_bytes_atomic;
use fd_io::scenario::{load_scenario, Scenario};
use fd_io::snapshot::write_snapshot_file;
use fd_io::IoError;
use fd_pipeline::{
    run_scenario, validate_inputs, AlgorithmRegistry, DriverError, Session, StepMachine,
};

/// Error classes, one per exit code.
#[derive(Debug)]
enum MainError {
    Validation(String),
    Step(String),
    Io(String),
    Geometry(String),
}

impl MainError {
    fn code(&self) -> u8 {
        match self {
            MainError::Validation(_) => exitcodes::VALIDATION,
            MainError::Step(_) => exitcodes::STEP,
            MainError::Io(_) => exitcodes::IO,
            MainError::Geometry(_) => exitcodes::GEOMETRY,
        }
    }

    fn message(&self) -> &str {
        match self {
            MainError::Validation(m) | MainError::Step(m) | MainError::Io(m) | MainError::Geometry(m) => m,
        }
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Path(_) | IoError::Hash(_) => MainError::Io(e.to_string()),
        IoError::Json { .. } | IoError::Invalid(_) | IoError::Version { .. } => MainError::Validation(e.to_string()),
    }
}

fn map_driver_err(e: DriverError) -> MainError {
    match e {
        DriverError::Configuration(_) | DriverError::Validation(_) => MainError::Validation(e.to_string()),
        DriverError::Geometry(_) => MainError::Geometry(e.to_string()),
        DriverError::StepExecution(_) | DriverError::AlreadyRecorded | DriverError::Stalled(_) => {
            MainError::Step(e.to_string())
        }
        DriverError::Io(io) => map_io_err(io),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = args.validate() {
        eprintln!("fd: error: {e}");
        return ExitCode::from(exitcodes::VALIDATION);
    }

    let rc = match dispatch(&args) {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("fd: error: {}", e.message());
            e.code()
        }
    };
    ExitCode::from(rc)
}

fn dispatch(args: &Args) -> Result<(), MainError> {
    let registry = AlgorithmRegistry::standard().map_err(|e| MainError::Validation(e.to_string()))?;
    match &args.command {
        Command::Validate { scenario } => validate(scenario, &registry),
        Command::Run { scenario, render, out, snapshot } => {
            run(scenario, &registry, *render, out.as_deref(), snapshot.as_deref())
        }
        Command::Algorithms => {
            list_algorithms(&registry);
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Scenario, MainError> {
    let scenario = load_scenario(path).map_err(map_io_err)?;
    debug!(path = %path.display(), sha256 = %scenario.source_sha256, "scenario loaded");
    Ok(scenario)
}

/// Prints every issue, then fails if any is an error.
fn validate(path: &Path, registry: &AlgorithmRegistry) -> Result<(), MainError> {
    let scenario = load(path)?;
    let config = registry
        .config(&scenario.algorithm, scenario.player_count)
        .map_err(|e| MainError::Validation(e.to_string()))?;
    let session = Session::from_scenario(&scenario);

    let report = validate_inputs(&session, scenario.player_count, session.regions(), session.params());
    for issue in &report.issues {
        println!("{issue}");
    }
    if !report.pass {
        let errors = report.errors().count();
        return Err(MainError::Validation(format!("{errors} validation error(s)")));
    }

    // Config shape and the driver's own checks.
    StepMachine::initialize(config, &session).map_err(map_driver_err)?;
    println!(
        "ok: {} with {} players, {} regions",
        scenario.algorithm,
        scenario.player_count,
        session.regions().len()
    );
    Ok(())
}

fn run(
    path: &Path,
    registry: &AlgorithmRegistry,
    render: RenderFormat,
    out: Option<&Path>,
    snapshot: Option<&Path>,
) -> Result<(), MainError> {
    let scenario = load(path)?;
    let outcome = run_scenario(&scenario, registry).map_err(map_driver_err)?;
    for event in &outcome.events {
        debug!(?event, "driver event");
    }
    let cache = outcome.session.engine().cache_stats();
    debug!(hits = cache.hits, misses = cache.misses, hit_rate = cache.hit_rate(), "distribution cache");

    let model = fd_report::build_model(&outcome.result).map_err(|e| MainError::Step(e.to_string()))?;
    let rendered = render_model(&model, render)?;

    match out {
        Some(p) => {
            write_bytes_atomic(p, rendered.as_bytes()).map_err(map_io_err)?;
            info!(path = %p.display(), "report written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| MainError::Io(format!("stdout: {e}")))?;
        }
    }

    if let Some(p) = snapshot {
        write_snapshot_file(p, &outcome.session.export_state()).map_err(map_io_err)?;
        info!(path = %p.display(), "snapshot written");
    }
    Ok(())
}

fn render_model(model: &fd_report::ReportModel, render: RenderFormat) -> Result<String, MainError> {
    match render {
        RenderFormat::Json => render_json(model),
        RenderFormat::Text => render_text(model),
    }
}

// Always accept the model; gate the body by feature.
fn render_json(model: &fd_report::ReportModel) -> Result<String, MainError> {
    #[cfg(feature = "report-json")]
    {
        fd_report::render_json_string(model).map_err(|e| MainError::Io(e.to_string()))
    }
    #[cfg(not(feature = "report-json"))]
    {
        let _ = model;
        Err(MainError::Validation("json renderer not enabled (build with feature `report-json`)".into()))
    }
}

fn render_text(model: &fd_report::ReportModel) -> Result<String, MainError> {
    #[cfg(feature = "report-text")]
    {
        Ok(fd_report::render_text(model))
    }
    #[cfg(not(feature = "report-text"))]
    {
        let _ = model;
        Err(MainError::Validation("text renderer not enabled (build with feature `report-text`)".into()))
    }
}

fn list_algorithms(registry: &AlgorithmRegistry) {
    let w = registry.iter().map(|e| e.id.as_str().len()).max().unwrap_or(0);
    for e in registry.iter() {
        let players = if e.min_players == e.max_players {
            e.min_players.to_string()
        } else {
            format!("{}-{}", e.min_players, e.max_players)
        };
        println!("{:<w$}  {:<3}  {}: {}", e.id.as_str(), players, e.name, e.summary);
    }
    if registry.is_empty() {
        warn!("no algorithms registered");
    }
}

