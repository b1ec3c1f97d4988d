//! RoundCoordinator: drives the round loop on rank 0.
//!
//! Each round walks the same phases:
//! 1. Distributing: cut every worker's slice (owned + halo rows) from the
//!    store and send all directives concurrently, then wait for the sends
//! 2. AwaitingResults: collect one reply per worker, buffered by rank
//! 3. Merge replies into the store in ascending rank order
//! 4. Evaluating: sequential satisfaction scan of the full grid
//!
//! The loop ends on convergence or after `max_rounds`, and the coordinator
//! then sends `Directive::Stop` to every worker. Rounds never overlap: the
//! next distribution starts only after every reply of the current round has
//! been merged.

use std::time::Duration;

use acton_reactive::prelude::*;
use futures::future::join_all;
use mti::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::{COORDINATOR_RANK, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::grid::GridStore;
use crate::messages::{Directive, SliceAssignment, SliceResult};
use crate::optimizer::PassStats;
use crate::partition::{Partition, partition_rows};
use crate::satisfaction::unsatisfied_count;

/// Coordinator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    Distributing,
    AwaitingResults,
    Evaluating,
    Terminated,
}

/// Outcome of a single round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Round number (1-based)
    pub round: usize,
    /// Agents examined across all workers
    pub examined: usize,
    /// Agents relocated across all workers
    pub relocated: usize,
    /// Unsatisfied agents left in place for lack of a free owned cell
    pub skipped: usize,
    /// Unsatisfied agents on the merged grid after this round
    pub unsatisfied: usize,
}

/// What the coordinator hands back once it has terminated.
#[derive(Debug)]
pub struct CoordinatorOutcome {
    pub store: GridStore,
    pub rounds: Vec<RoundResult>,
    pub converged: bool,
    pub final_unsatisfied: usize,
    /// Phases entered over the run, ending in `Terminated`
    pub phases: Vec<CoordinatorPhase>,
}

/// Seed for one worker's pass in one round.
pub fn pass_seed(base_seed: u64, round: usize, rank: usize) -> u64 {
    base_seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((round as u64) << 20)
        .wrapping_add(rank as u64)
}

/// Check that a store fits the configuration's grid.
pub fn check_store_dimensions(config: &SimulationConfig, store: &GridStore) -> Result<()> {
    let grid = store.grid();
    if grid.height() != config.height || grid.width() != config.width {
        return Err(SimulationError::InvalidConfig(format!(
            "store is {}x{}, configuration expects {}x{}",
            grid.height(),
            grid.width(),
            config.height,
            config.width
        )));
    }
    Ok(())
}

/// Owns the authoritative grid between rounds and drives the workers.
pub struct RoundCoordinator {
    config: SimulationConfig,
    store: GridStore,
    /// Worker handles; index `i` is rank `i + 1`
    workers: Vec<ActorHandle>,
    partitions: Vec<Partition>,
    results_rx: mpsc::Receiver<SliceResult>,
    base_seed: u64,
    phase: CoordinatorPhase,
    /// Every phase entered, in order
    phases: Vec<CoordinatorPhase>,
    round: usize,
}

impl RoundCoordinator {
    /// Create a coordinator over `store`.
    ///
    /// `workers[i]` must be the handle of rank `i + 1`; replies must arrive on
    /// `results_rx`.
    pub fn new(
        config: SimulationConfig,
        store: GridStore,
        workers: Vec<ActorHandle>,
        results_rx: mpsc::Receiver<SliceResult>,
        base_seed: u64,
    ) -> Result<Self> {
        if workers.len() != config.worker_count {
            return Err(SimulationError::InvalidConfig(format!(
                "{} worker handles for worker_count {}",
                workers.len(),
                config.worker_count
            )));
        }
        check_store_dimensions(&config, &store)?;

        let partitions = partition_rows(config.worker_count, config.height);
        Ok(Self {
            config,
            store,
            workers,
            partitions,
            results_rx,
            base_seed,
            phase: CoordinatorPhase::Distributing,
            phases: Vec::new(),
            round: 0,
        })
    }

    /// Run rounds until convergence or the round bound, then stop the workers.
    ///
    /// Workers are stopped on the error path too.
    pub async fn run(mut self) -> Result<CoordinatorOutcome> {
        let outcome = self.run_rounds().await;
        self.terminate().await;

        let (rounds, converged, final_unsatisfied) = outcome?;
        Ok(CoordinatorOutcome {
            store: self.store,
            rounds,
            converged,
            final_unsatisfied,
            phases: self.phases,
        })
    }

    fn transition(&mut self, next: CoordinatorPhase) {
        trace!(round = self.round, from = ?self.phase, to = ?next, "Phase transition");
        self.phase = next;
        self.phases.push(next);
    }

    /// Drive the phase machine until it reaches `Terminated`.
    async fn run_rounds(&mut self) -> Result<(Vec<RoundResult>, bool, usize)> {
        let mut rounds = Vec::new();
        let mut unsatisfied = self.evaluate();
        let mut correlation_id = String::new();
        let mut stats = PassStats::default();

        info!(
            rank = COORDINATOR_RANK,
            workers = self.workers.len(),
            agents = self.store.agent_count(),
            unsatisfied,
            max_rounds = self.config.max_rounds,
            "Round loop starting"
        );

        if self.config.max_rounds == 0 {
            self.transition(CoordinatorPhase::Terminated);
        } else {
            self.phases.push(self.phase);
        }

        loop {
            match self.phase {
                CoordinatorPhase::Distributing => {
                    self.round += 1;
                    correlation_id = self.distribute().await;
                    self.transition(CoordinatorPhase::AwaitingResults);
                }
                CoordinatorPhase::AwaitingResults => {
                    let results = self.await_results(&correlation_id).await?;
                    stats = self.merge(results)?;
                    self.transition(CoordinatorPhase::Evaluating);
                }
                CoordinatorPhase::Evaluating => {
                    unsatisfied = self.evaluate();
                    info!(
                        round = self.round,
                        relocated = stats.relocated,
                        skipped = stats.skipped,
                        unsatisfied,
                        "Round complete"
                    );
                    rounds.push(RoundResult {
                        round: self.round,
                        examined: stats.examined,
                        relocated: stats.relocated,
                        skipped: stats.skipped,
                        unsatisfied,
                    });

                    if unsatisfied == 0 || self.round >= self.config.max_rounds {
                        self.transition(CoordinatorPhase::Terminated);
                    } else {
                        self.transition(CoordinatorPhase::Distributing);
                    }
                }
                CoordinatorPhase::Terminated => break,
            }
        }

        let converged = unsatisfied == 0;
        if converged {
            info!(rounds = self.round, "All agents are satisfied");
        } else {
            info!(rounds = self.round, unsatisfied, "Max rounds reached");
        }
        Ok((rounds, converged, unsatisfied))
    }

    /// Send every worker its slice for the current round.
    ///
    /// All sends are issued before any is awaited.
    async fn distribute(&self) -> String {
        let correlation_id = "round".create_type_id::<V7>().to_string();
        let grid = self.store.grid();

        let sends = self
            .workers
            .iter()
            .zip(&self.partitions)
            .map(|(handle, partition)| {
                let assignment = SliceAssignment {
                    correlation_id: correlation_id.clone(),
                    round: self.round,
                    partition: *partition,
                    width: grid.width(),
                    grid_slice: grid
                        .rows(partition.slice_start(), partition.slice_row_count())
                        .to_vec(),
                    agent_types: self.store.types().clone(),
                    threshold_percent: self.config.satisfaction_threshold_percent,
                    seed: pass_seed(self.base_seed, self.round, partition.owner_rank),
                };
                let handle = handle.clone();
                async move {
                    handle.send(Directive::Continue(assignment)).await;
                }
            })
            .collect::<Vec<_>>();

        trace!(
            correlation_id = %correlation_id,
            round = self.round,
            workers = sends.len(),
            "Fanning out slices"
        );
        join_all(sends).await;

        correlation_id
    }

    /// Wait until every worker has replied for `correlation_id`.
    ///
    /// Returns results in ascending rank order. Without a configured timeout
    /// this waits indefinitely for a silent worker.
    async fn await_results(&mut self, correlation_id: &str) -> Result<Vec<SliceResult>> {
        let round = self.round;
        let deadline = self
            .config
            .reply_timeout_ms
            .map(|ms| (ms, Instant::now() + Duration::from_millis(ms)));
        let mut slots: Vec<Option<SliceResult>> = vec![None; self.workers.len()];

        while slots.iter().any(Option::is_none) {
            let received = match deadline {
                Some((timeout_ms, at)) => {
                    match tokio::time::timeout_at(at, self.results_rx.recv()).await {
                        Ok(received) => received,
                        Err(_) => {
                            let rank = slots.iter().position(Option::is_none).unwrap_or(0) + 1;
                            return Err(SimulationError::WorkerStalled {
                                rank,
                                round,
                                timeout_ms,
                            });
                        }
                    }
                }
                None => self.results_rx.recv().await,
            };

            let Some(result) = received else {
                return Err(SimulationError::ResultChannelClosed { round });
            };

            if result.correlation_id != correlation_id {
                warn!(
                    rank = result.rank,
                    round = result.round,
                    correlation_id = %result.correlation_id,
                    "Discarding reply for another round"
                );
                continue;
            }

            let Some(slot) = result.rank.checked_sub(1).and_then(|idx| slots.get_mut(idx))
            else {
                return Err(SimulationError::MalformedResult {
                    rank: result.rank,
                    reason: format!("no worker with rank {}", result.rank),
                });
            };
            if slot.is_some() {
                warn!(rank = result.rank, round, "Discarding duplicate reply");
                continue;
            }
            debug!(rank = result.rank, round, "Reply received");
            *slot = Some(result);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Write each worker's owned rows back at its owned offset.
    fn merge(&mut self, results: Vec<SliceResult>) -> Result<PassStats> {
        let width = self.store.grid().width();
        let mut totals = PassStats::default();

        for result in results {
            let partition = self.partitions[result.rank - 1];
            let expected = partition.owned_row_count * width;
            if result.updated_owned_rows.len() != expected {
                return Err(SimulationError::MalformedResult {
                    rank: result.rank,
                    reason: format!(
                        "{} cells returned, expected {}",
                        result.updated_owned_rows.len(),
                        expected
                    ),
                });
            }
            self.store
                .grid_mut()
                .write_rows(partition.owned_row_start, &result.updated_owned_rows)?;

            totals.examined += result.stats.examined;
            totals.unsatisfied += result.stats.unsatisfied;
            totals.relocated += result.stats.relocated;
            totals.skipped += result.stats.skipped;
        }

        Ok(totals)
    }

    fn evaluate(&self) -> usize {
        unsatisfied_count(
            self.store.grid(),
            self.store.types(),
            self.config.satisfaction_threshold_percent,
        )
    }

    /// Broadcast the stop flag. No grid data follows.
    async fn terminate(&mut self) {
        let stops = self
            .workers
            .iter()
            .map(|handle| {
                let handle = handle.clone();
                async move {
                    handle.send(Directive::Stop).await;
                }
            })
            .collect::<Vec<_>>();
        join_all(stops).await;

        if self.phase != CoordinatorPhase::Terminated {
            self.transition(CoordinatorPhase::Terminated);
        }
        debug!(rounds = self.round, "Coordinator terminated");
    }
}
