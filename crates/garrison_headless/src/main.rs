//! Headless garrison match runner.
//!
//! This binary runs matches without graphics, controlled via JSON on stdin/stdout.
//! Designed for AI agents, balance testing and CI determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p garrison_headless
//!
//! # Play a scenario file over the protocol
//! cargo run -p garrison_headless -- run \
//!     --scenario crates/garrison_headless/scenarios/crossroads.ron --auto-state
//!
//! # Play one AI-vs-AI match and print its metrics
//! cargo run -p garrison_headless -- simulate --scenario generated --seed 7
//!
//! # Run batch balance test
//! cargo run -p garrison_headless -- batch --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p garrison_headless -- verify --seed 42 --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use garrison_core::prelude::Difficulty;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use garrison_headless::{
    batch::{run_batch, BatchConfig, BatchResults},
    game_runner::{run_game, verify_determinism, GameConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "garrison_headless")]
#[command(about = "Headless territory-capture match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one match driven by JSON commands on stdin
    Run {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,

        /// Milliseconds per tick when a command names none
        #[arg(long, default_value = "16")]
        tick_ms: u32,
    },

    /// Play one AI-vs-AI match and print its metrics as JSON
    Simulate {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Player autopilot difficulty (easy, medium, hard)
        #[arg(long)]
        autopilot: Option<Difficulty>,

        /// Game-time limit in seconds
        #[arg(short, long, default_value = "600")]
        duration_secs: u64,

        /// Write metrics here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of AI-vs-AI matches for balance testing
    Batch {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Seed of the first match
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Player autopilot difficulty (easy, medium, hard)
        #[arg(long)]
        autopilot: Option<Difficulty>,

        /// Game-time limit per match in seconds
        #[arg(short, long, default_value = "600")]
        duration_secs: u64,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or path to a RON file
        #[arg(short, long, default_value = "standard")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Game-time limit per run in seconds
        #[arg(short, long, default_value = "120")]
        duration_secs: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the protocol
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            auto_state,
            tick_ms,
        }) => cmd_run(&scenario, seed, auto_state, tick_ms),
        Some(Commands::Simulate {
            scenario,
            seed,
            autopilot,
            duration_secs,
            output,
        }) => cmd_simulate(&scenario, seed, autopilot, duration_secs, output),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            autopilot,
            duration_secs,
        }) => cmd_batch(&scenario, count, parallel, output, seed, autopilot, duration_secs),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            duration_secs,
        }) => cmd_verify(&scenario, seed, runs, duration_secs),
        None => {
            // Default: interactive mode
            cmd_run("standard", None, false, 16)
        }
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<ExitCode, String>;

fn load_scenario(name: &str) -> Result<Scenario, String> {
    Scenario::resolve(name).map_err(|e| e.to_string())
}

/// Play a single match over stdin/stdout
fn cmd_run(scenario: &str, seed: Option<u64>, auto_state: bool, tick_ms: u32) -> CmdResult {
    let mut scenario = load_scenario(scenario)?;
    if let Some(seed) = seed {
        scenario.seed = seed;
    }
    tracing::info!(scenario = %scenario.name, seed = scenario.seed, "Starting interactive session");

    let config = HeadlessConfig {
        auto_state_output: auto_state,
        tick_ms,
    };
    let mut runner = HeadlessRunner::from_scenario(&scenario, config).map_err(|e| e.to_string())?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    runner
        .run(stdin.lock(), stdout.lock())
        .map_err(|e| format!("Protocol IO failed: {e}"))?;

    tracing::info!(ticks = runner.game().tick_count(), "Session ended");
    Ok(ExitCode::SUCCESS)
}

/// Play one AI-vs-AI match
fn cmd_simulate(
    scenario: &str,
    seed: Option<u64>,
    autopilot: Option<Difficulty>,
    duration_secs: u64,
    output: Option<PathBuf>,
) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    let seed = seed.unwrap_or(scenario.seed);
    let config = GameConfig {
        max_duration_ms: duration_secs.saturating_mul(1000),
        autopilot,
        ..GameConfig::with_seed(seed)
    };

    tracing::info!(scenario = %scenario.name, seed, "Simulating match");
    let metrics = run_game(&scenario, &config).map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&metrics).map_err(|e| e.to_string())?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .map_err(|e| format!("Cannot write '{}': {e}", path.display()))?;
            eprintln!("Metrics written to {}", path.display());
        }
        None => println!("{json}"),
    }

    match metrics.winner {
        Some(winner) => eprintln!("{winner} won after {} ms", metrics.duration_ms),
        None => eprintln!("No winner after {} ms", metrics.duration_ms),
    }
    Ok(ExitCode::SUCCESS)
}

/// Run batch of matches for balance testing
fn cmd_batch(
    scenario: &str,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    autopilot: Option<Difficulty>,
    duration_secs: u64,
) -> CmdResult {
    let scenario = load_scenario(scenario)?;

    let num_cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        output = %output.display(),
        cpus_available = num_cpus,
        duration_secs,
        "Batch configuration"
    );

    std::fs::create_dir_all(&output)
        .map_err(|e| format!("Cannot create output directory '{}': {e}", output.display()))?;

    let config = BatchConfig {
        parallel_games: parallel,
        autopilot,
        ..BatchConfig::new(scenario, count)
            .with_seed(seed)
            .with_duration(duration_secs.saturating_mul(1000))
    };
    let results = run_batch(config);

    let results_path = BatchResults::default_path(&output);
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", summary.total_games);
    if !results.errors.is_empty() {
        eprintln!("Games failed: {}", results.errors.len());
    }
    eprintln!("Player wins:  {}", summary.player_wins);
    eprintln!("Enemy wins:   {}", summary.enemy_wins);
    eprintln!("Unfinished:   {}", summary.unfinished);
    eprintln!("Player win rate (decided): {:.1}%", summary.player_win_rate * 100.0);
    eprintln!("Average decided length: {:.1}s", summary.avg_decided_duration_ms / 1000.0);
    eprintln!("Results: {}", results_path.display());

    if results.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Verify determinism of one seed
fn cmd_verify(scenario: &str, seed: u64, runs: u32, duration_secs: u64) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    let config = GameConfig {
        max_duration_ms: duration_secs.saturating_mul(1000),
        ..GameConfig::with_seed(seed)
    };
    let report = verify_determinism(&scenario, &config, runs).map_err(|e| e.to_string())?;

    if report.is_deterministic() {
        if let Some(hash) = report.hashes.first() {
            eprintln!("PASS: All {runs} runs produced identical results (hash {hash:016x})");
        } else {
            eprintln!("PASS: nothing to compare");
        }
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in report.hashes.iter().enumerate() {
            eprintln!("  run {run}: {hash:016x}");
        }
        Ok(ExitCode::FAILURE)
    }
}
