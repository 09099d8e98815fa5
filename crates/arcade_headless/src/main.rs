//! Headless arcade combat runner.
//!
//! Runs a scenario without graphics and streams the event log as JSON lines.
//! Designed for CI testing and balance iteration.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario for 600 ticks of 16 ms
//! cargo run -p arcade_headless -- run --scenario scenarios/crate_wall.ron
//!
//! # Override seed and tick length, layering custom definitions
//! cargo run -p arcade_headless -- run --scenario scenarios/ambush.ron --definitions data/ --seed 7 --tick-ms 33
//!
//! # Validate a definitions directory
//! cargo run -p arcade_headless -- defs --definitions data/
//! ```
//!
//! # Output
//!
//! Output (stdout): one JSON event record per line, then a summary line
//! Logs (stderr): Debug information

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arcade_core::data::Definitions;
use arcade_headless::{
    definitions_loader::load_definitions_dir,
    runner::{HeadlessRunner, RunConfig},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "arcade_headless")]
#[command(about = "Headless arcade combat runner for CI and balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its event log
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Directory of definition files layered over the builtin tables
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,

        /// Milliseconds per tick
        #[arg(long, default_value = "16")]
        tick_ms: u32,

        /// Override the scenario's random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate a definitions directory and print table sizes
    Defs {
        /// Directory of definition files
        #[arg(short, long)]
        definitions: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for the event stream)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            definitions,
            ticks,
            tick_ms,
            seed,
        } => cmd_run(&scenario, definitions.as_deref(), RunConfig { ticks, tick_ms }, seed),
        Commands::Defs { definitions } => cmd_defs(&definitions),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

/// Load definitions, falling back to the builtin tables.
fn load_definitions(dir: Option<&std::path::Path>) -> Result<Definitions, String> {
    let Some(dir) = dir else {
        return Ok(Definitions::builtin());
    };
    let loaded = load_definitions_dir(dir).map_err(|e| e.to_string())?;
    tracing::info!(
        applied = loaded.applied.len(),
        skipped = loaded.skipped.len(),
        "Definitions loaded from {}",
        dir.display()
    );
    Ok(loaded.definitions)
}

/// Run a scenario
fn cmd_run(
    scenario_path: &std::path::Path,
    definitions: Option<&std::path::Path>,
    config: RunConfig,
    seed: Option<u64>,
) -> Result<(), String> {
    let defs = load_definitions(definitions)?;
    let scenario = Scenario::load(scenario_path).map_err(|e| e.to_string())?;
    let (sim, spawned) = scenario.build(defs, seed).map_err(|e| e.to_string())?;

    tracing::info!(
        scenario = %scenario.name,
        ticks = config.ticks,
        tick_ms = config.tick_ms,
        "Starting run"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let runner = HeadlessRunner::new(sim, spawned, scenario.inputs, config);
    runner.run(&mut out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// Validate definitions
fn cmd_defs(dir: &std::path::Path) -> Result<(), String> {
    let loaded = load_definitions_dir(dir).map_err(|e| e.to_string())?;

    for (path, count) in &loaded.applied {
        println!("ok      {} ({} entries)", path.display(), count);
    }
    for (path, reason) in &loaded.skipped {
        println!("skipped {}: {}", path.display(), reason);
    }

    let defs = &loaded.definitions;
    println!("weapons:     {}", defs.weapons.len());
    println!("bombs:       {}", defs.bombs.len());
    println!("ai profiles: {}", defs.ai_profiles.len());
    println!("difficulty:  {}", defs.difficulty.len());
    println!("interaction radii: {}", defs.interaction_radii.len());

    if loaded.skipped.is_empty() {
        Ok(())
    } else {
        Err(format!("{} definition file(s) failed to load", loaded.skipped.len()))
    }
}
