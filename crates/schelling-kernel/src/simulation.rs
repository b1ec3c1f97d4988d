//! Simulation launcher: validates, builds the fabric and runs the coordinator.
//!
//! ## Usage
//!
//! ```ignore
//! use schelling_kernel::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig { worker_count: 4, seed: Some(7), ..Default::default() };
//! let outcome = Simulation::new(config).run().await?;
//! println!("converged: {}", outcome.report.converged);
//! ```

use acton_reactive::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::actors::{ResultCollector, WorkerActor};
use crate::config::SimulationConfig;
use crate::coordinator::{RoundCoordinator, RoundResult, check_store_dimensions};
use crate::error::Result;
use crate::grid::{Grid, GridStore};
use crate::satisfaction::unsatisfied_count;

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    /// Agents on the grid
    pub agent_count: usize,
    /// Unsatisfied agents before the first round
    pub initial_unsatisfied: usize,
    /// Rounds actually executed
    pub rounds_executed: usize,
    /// Whether every agent ended satisfied
    pub converged: bool,
    /// Unsatisfied agents after the last round
    pub final_unsatisfied: usize,
    /// Per-round results
    pub rounds: Vec<RoundResult>,
    /// Grid after the last round
    pub final_grid: Grid,
}

/// A finished run: the report plus the final store for rendering.
#[derive(Debug)]
pub struct SimulationOutcome {
    pub report: SimulationReport,
    pub store: GridStore,
}

/// Builder for a single simulation run.
pub struct Simulation {
    config: SimulationConfig,
    initial_store: Option<GridStore>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            initial_store: None,
        }
    }

    /// Start from a prepared store instead of a random population.
    ///
    /// The store's dimensions must match the configuration.
    pub fn with_initial_store(mut self, store: GridStore) -> Self {
        self.initial_store = Some(store);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Build the initial store: the prepared one, or a fresh random population.
    ///
    /// Startup preconditions are checked first; nothing is allocated when they
    /// fail.
    pub fn prepare_store(&mut self) -> Result<GridStore> {
        self.config.validate()?;

        if let Some(store) = self.initial_store.take() {
            check_store_dimensions(&self.config, &store)?;
            return Ok(store);
        }

        let mut store = GridStore::allocate(self.config.height, self.config.width);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        store.initialize_population(self.config.agent_count(), &mut rng)?;
        Ok(store)
    }

    /// Run the simulation to convergence or the round bound.
    pub async fn run(mut self) -> Result<SimulationOutcome> {
        let store = self.prepare_store()?;
        let config = self.config;

        let agent_count = store.agent_count();
        let initial_unsatisfied = unsatisfied_count(
            store.grid(),
            store.types(),
            config.satisfaction_threshold_percent,
        );
        let base_seed = config.seed.unwrap_or_else(rand::random);

        let mut runtime = ActonApp::launch_async().await;

        let (results_tx, results_rx) = mpsc::channel(config.worker_count * 2);
        let collector = ResultCollector::new(results_tx).spawn(&mut runtime).await;

        let mut workers = Vec::with_capacity(config.worker_count);
        for rank in 1..=config.worker_count {
            let worker = WorkerActor::new(rank, collector.clone());
            workers.push(worker.spawn(&mut runtime).await);
        }
        debug!(workers = workers.len(), "Workers spawned");

        let outcome = match RoundCoordinator::new(config, store, workers, results_rx, base_seed) {
            Ok(coordinator) => coordinator.run().await,
            Err(e) => Err(e),
        };

        // Shutdown runtime
        let _ = runtime.shutdown_all().await;

        let outcome = outcome?;
        let report = SimulationReport {
            run_id: Uuid::new_v4(),
            agent_count,
            initial_unsatisfied,
            rounds_executed: outcome.rounds.len(),
            converged: outcome.converged,
            final_unsatisfied: outcome.final_unsatisfied,
            rounds: outcome.rounds,
            final_grid: outcome.store.grid().clone(),
        };

        info!(
            run_id = %report.run_id,
            rounds = report.rounds_executed,
            converged = report.converged,
            unsatisfied = report.final_unsatisfied,
            "Simulation finished"
        );

        Ok(SimulationOutcome {
            report,
            store: outcome.store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;

    #[test]
    fn test_fatal_path_allocates_nothing() {
        let config = SimulationConfig {
            worker_count: 1,
            ..Default::default()
        };
        let mut simulation = Simulation::new(config);
        let err = simulation.prepare_store().unwrap_err();
        assert!(matches!(
            err,
            SimulationError::FabricTooSmall {
                process_count: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_seeded_population_is_reproducible() {
        let config = SimulationConfig {
            height: 8,
            width: 8,
            seed: Some(99),
            ..Default::default()
        };
        let first = Simulation::new(config.clone()).prepare_store().unwrap();
        let second = Simulation::new(config).prepare_store().unwrap();
        assert_eq!(first.grid(), second.grid());
        assert_eq!(first.agent_count(), 44);
    }

    #[test]
    fn test_initial_store_must_match_grid() {
        let config = SimulationConfig {
            height: 6,
            width: 6,
            ..Default::default()
        };
        let mut simulation = Simulation::new(config).with_initial_store(GridStore::allocate(6, 5));
        assert!(matches!(
            simulation.prepare_store(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_fatal_path_returns_before_launch() {
        let config = SimulationConfig {
            height: 2,
            worker_count: 3,
            ..Default::default()
        };
        let err = Simulation::new(config).run().await.unwrap_err();
        assert_eq!(
            err,
            SimulationError::GridTooShort {
                height: 2,
                worker_count: 3
            }
        );
    }
}
