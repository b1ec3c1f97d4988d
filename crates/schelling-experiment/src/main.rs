//! Schelling Segregation Experiment CLI.
//!
//! Commands:
//! - single: Run a single simulation
//! - sweep: Run a parameter sweep (thresholds × worker counts × trials)
//! - generate: Generate and display an initial population

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use schelling_experiment::config::{ConfigOverrides, resolve_config};
use schelling_experiment::results::{SweepResults, format_duration};
use schelling_experiment::runner::{log_banner, run_simulation, run_trial, sweep_configs};
use schelling_kernel::Simulation;
use schelling_kernel::satisfaction::unsatisfied_count;

/// Generate a timestamped output path from the given path.
/// e.g., "sweep.json" -> "sweep-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "schelling-experiment")]
#[command(version)]
#[command(about = "Partitioned Schelling segregation simulations")]
struct Cli {
    /// Configuration file (.toml or .json); flags override its values
    #[arg(long, env = "SCHELLING_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Single {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Print the grid before and after the run
        #[arg(long)]
        show_grid: bool,

        /// Output file for the result
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a parameter sweep
    Sweep {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Number of trials per configuration
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Satisfaction thresholds to test (comma-separated)
        #[arg(long, default_value = "30,50,70", value_delimiter = ',')]
        thresholds: Vec<u8>,

        /// Worker counts to test (comma-separated)
        #[arg(long, default_value = "2,3,4", value_delimiter = ',')]
        worker_counts: Vec<usize>,

        /// Output file for results
        #[arg(long, default_value = "sweep.json")]
        output: PathBuf,
    },

    /// Generate and display an initial population
    Generate {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Single {
            overrides,
            show_grid,
            output,
        } => {
            let config = resolve_config(config_path, &overrides)?;
            log_banner(&config);

            let mut simulation = Simulation::new(config);
            let initial = simulation.prepare_store()?;
            if show_grid {
                println!("Initial grid:\n{}", initial);
            }

            let (result, store) = run_simulation(simulation.with_initial_store(initial), 0).await?;

            println!("\n=== Simulation Result ===");
            println!("Run: {}", result.run_id);
            println!(
                "Grid: {}x{}, {}% empty, threshold {}%",
                result.config.height,
                result.config.width,
                result.config.empty_percent,
                result.config.satisfaction_threshold_percent
            );
            println!("Workers: {}", result.config.worker_count);
            println!("Agents: {}", result.agent_count);
            println!("Converged: {}", result.converged);
            println!("Rounds: {}", result.rounds_executed);
            println!(
                "Unsatisfied: {} -> {}",
                result.initial_unsatisfied, result.final_unsatisfied
            );
            println!("Relocations: {}", result.total_relocated);
            println!("Elapsed: {}", format_duration(result.elapsed_ms));

            if show_grid {
                println!("\nFinal grid:\n{}", store);
            }

            if let Some(output) = output {
                result.save(&output)?;
                println!("Result saved to: {}", output.display());
            }
        }

        Commands::Sweep {
            overrides,
            trials,
            thresholds,
            worker_counts,
            output,
        } => {
            let base = resolve_config(config_path, &overrides)?;
            info!(
                trials = trials,
                height = base.height,
                width = base.width,
                "Starting sweep"
            );

            let runs = sweep_configs(&base, &thresholds, &worker_counts, trials);
            let total = runs.len();
            let mut results = SweepResults::new();

            for (completed, (config, trial)) in runs.into_iter().enumerate() {
                let threshold = config.satisfaction_threshold_percent;
                let workers = config.worker_count;
                let (result, _) = run_trial(config, trial).await?;

                info!(
                    progress = format!("{}/{}", completed + 1, total),
                    threshold = threshold,
                    workers = workers,
                    trial = trial,
                    rounds = result.rounds_executed,
                    converged = result.converged,
                    "Completed run"
                );
                results.add(result);
            }

            results.compute_summary();
            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Sweep Complete ===");
            println!("Results saved to: {}", output_path.display());
            println!("\nSummary:");
            for (key, summary) in &results.summary {
                println!(
                    "  {}: solve_rate={:.1}% [{:.1}, {:.1}], avg_rounds={:.1} (min {}, max {})",
                    key,
                    summary.solve_rate * 100.0,
                    summary.solve_rate_ci.0 * 100.0,
                    summary.solve_rate_ci.1 * 100.0,
                    summary.avg_rounds,
                    summary.min_rounds,
                    summary.max_rounds
                );
            }
        }

        Commands::Generate { overrides } => {
            let config = resolve_config(config_path, &overrides)?;
            let store = Simulation::new(config.clone()).prepare_store()?;

            println!("{}", store);
            println!("Agents: {}", store.agent_count());
            println!("Empty cells: {}", store.grid().empty_count());
            println!(
                "Unsatisfied at {}%: {}",
                config.satisfaction_threshold_percent,
                unsatisfied_count(
                    store.grid(),
                    store.types(),
                    config.satisfaction_threshold_percent
                )
            );
        }
    }

    Ok(())
}
