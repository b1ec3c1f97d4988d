//! Runs simulations for the CLI and turns them into experiment results.

use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use schelling_kernel::{GridStore, Simulation, SimulationConfig};

use crate::results::ExperimentResult;

/// Log the run parameters before a simulation starts.
pub fn log_banner(config: &SimulationConfig) {
    info!(
        height = config.height,
        width = config.width,
        empty_percent = config.empty_percent,
        threshold = config.satisfaction_threshold_percent,
        max_rounds = config.max_rounds,
        workers = config.worker_count,
        agents = config.agent_count(),
        "Schelling segregation simulation"
    );
}

/// Run one simulation from a fresh population and time it.
///
/// Returns the final store alongside the result for rendering.
pub async fn run_trial(
    config: SimulationConfig,
    trial: usize,
) -> Result<(ExperimentResult, GridStore)> {
    run_simulation(Simulation::new(config), trial).await
}

/// Run a prepared simulation and time it.
pub async fn run_simulation(
    simulation: Simulation,
    trial: usize,
) -> Result<(ExperimentResult, GridStore)> {
    let config = simulation.config().clone();
    let started_at = Utc::now();
    let clock = Instant::now();

    let outcome = simulation.run().await?;

    let elapsed_ms = clock.elapsed().as_millis() as u64;
    let ended_at = Utc::now();

    let result = ExperimentResult::from_report(
        config,
        trial,
        started_at,
        ended_at,
        elapsed_ms,
        &outcome.report,
    );
    Ok((result, outcome.store))
}

/// Expand a sweep into one configuration per (threshold, workers, trial).
///
/// With a base seed, trial `t` runs with `seed + t` so every sweep point sees
/// the same sequence of populations.
pub fn sweep_configs(
    base: &SimulationConfig,
    thresholds: &[u8],
    worker_counts: &[usize],
    trials: usize,
) -> Vec<(SimulationConfig, usize)> {
    let mut configs = Vec::with_capacity(thresholds.len() * worker_counts.len() * trials);
    for &threshold in thresholds {
        for &worker_count in worker_counts {
            for trial in 0..trials {
                let config = SimulationConfig {
                    satisfaction_threshold_percent: threshold,
                    worker_count,
                    seed: base.seed.map(|seed| seed.wrapping_add(trial as u64)),
                    ..base.clone()
                };
                configs.push((config, trial));
            }
        }
    }
    configs
}
