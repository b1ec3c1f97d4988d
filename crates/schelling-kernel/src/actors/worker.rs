//! WorkerActor: one rank of the compute fabric.
//!
//! Purely reactive. Each `Directive::Continue` carries everything the pass
//! needs (slice, type table, threshold, seed), so the worker holds nothing
//! between rounds except whether it has been told to stop.

use acton_reactive::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::messages::{Directive, SliceAssignment, SliceResult};
use crate::optimizer::{LocalBuffer, PassStats, optimize};

/// Run one local pass for an assignment and build the reply.
///
/// A slice that does not match its partition yields a reply with no rows,
/// which the coordinator rejects as malformed instead of waiting forever.
pub fn run_pass(assignment: SliceAssignment) -> SliceResult {
    let SliceAssignment {
        correlation_id,
        round,
        partition,
        width,
        grid_slice,
        agent_types,
        threshold_percent,
        seed,
    } = assignment;
    let rank = partition.owner_rank;

    let mut buffer = match LocalBuffer::from_cells(partition, width, grid_slice) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!(rank, round, error = %e, "Discarding malformed slice");
            return SliceResult {
                correlation_id,
                round,
                rank,
                updated_owned_rows: Vec::new(),
                stats: PassStats::default(),
            };
        }
    };

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let stats = optimize(&mut buffer, &agent_types, threshold_percent, &mut rng);

    debug!(
        rank,
        round,
        examined = stats.examined,
        unsatisfied = stats.unsatisfied,
        relocated = stats.relocated,
        skipped = stats.skipped,
        "Local pass complete"
    );

    SliceResult {
        correlation_id,
        round,
        rank,
        updated_owned_rows: buffer.into_owned_cells(),
        stats,
    }
}

/// Actor state for a worker.
#[derive(Default, Clone)]
pub struct WorkerActorState {
    /// Worker rank (1-based)
    pub rank: usize,
    /// Set once `Directive::Stop` arrives
    pub stopped: bool,
    /// Where pass results go
    pub collector: Option<ActorHandle>,
}

impl std::fmt::Debug for WorkerActorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerActorState")
            .field("rank", &self.rank)
            .field("stopped", &self.stopped)
            .field("collector", &self.collector.is_some())
            .finish()
    }
}

/// Actor wrapping the per-worker receive/compute/send cycle.
pub struct WorkerActor {
    rank: usize,
    collector: ActorHandle,
}

impl WorkerActor {
    /// Create a worker for `rank` that replies to `collector`.
    pub fn new(rank: usize, collector: ActorHandle) -> Self {
        Self { rank, collector }
    }

    /// Spawn the worker in the runtime.
    ///
    /// Directives are handled with `mutate_on`, so a worker processes one
    /// round at a time in mailbox order.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor =
            runtime.new_actor_with_name::<WorkerActorState>(format!("Worker:{}", self.rank));

        actor.model.rank = self.rank;
        actor.model.collector = Some(self.collector);

        actor.mutate_on::<Directive>(|actor, context| {
            let rank = actor.model.rank;
            let directive = context.message().clone();
            trace!(rank, flag = ?directive.flag(), "Directive received");

            match directive {
                Directive::Stop => {
                    actor.model.stopped = true;
                    debug!(rank, "Worker stopped");
                    Reply::ready()
                }
                Directive::Continue(assignment) => {
                    if actor.model.stopped {
                        warn!(
                            rank,
                            round = assignment.round,
                            "Assignment received after stop; ignoring"
                        );
                        return Reply::ready();
                    }
                    let Some(collector) = actor.model.collector.clone() else {
                        warn!(rank, "Worker has no collector");
                        return Reply::ready();
                    };

                    let result = run_pass(assignment);
                    Reply::pending(async move {
                        collector.send(result).await;
                    })
                }
            }
        });

        actor.start().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grid::{AgentType, Grid};
    use crate::partition::Partition;

    fn assignment_for(grid: &Grid, partition: Partition, types: Vec<AgentType>) -> SliceAssignment {
        SliceAssignment {
            correlation_id: "round-test".to_string(),
            round: 1,
            partition,
            width: grid.width(),
            grid_slice: grid
                .rows(partition.slice_start(), partition.slice_row_count())
                .to_vec(),
            agent_types: Arc::from(types),
            threshold_percent: 50,
            seed: 11,
        }
    }

    #[test]
    fn test_run_pass_returns_owned_rows_only() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(0, 0, Some(0));
        grid.set_cell(0, 1, Some(1));
        let partition = Partition::for_rank(2, 2, 4);

        let result = run_pass(assignment_for(&grid, partition, vec![AgentType::A, AgentType::B]));

        assert_eq!(result.rank, 2);
        assert_eq!(result.round, 1);
        assert_eq!(result.correlation_id, "round-test");
        assert_eq!(result.updated_owned_rows.len(), 2 * 4);
        assert!(result.updated_owned_rows.iter().all(Option::is_none));
    }

    #[test]
    fn test_run_pass_is_deterministic_for_a_seed() {
        let mut grid = Grid::new(4, 4);
        grid.set_cell(0, 0, Some(0));
        grid.set_cell(0, 1, Some(1));
        let partition = Partition::for_rank(1, 2, 4);
        let types = vec![AgentType::A, AgentType::B];

        let first = run_pass(assignment_for(&grid, partition, types.clone()));
        let second = run_pass(assignment_for(&grid, partition, types));
        assert_eq!(first.updated_owned_rows, second.updated_owned_rows);
    }

    #[test]
    fn test_malformed_slice_yields_empty_reply() {
        let grid = Grid::new(4, 4);
        let partition = Partition::for_rank(1, 2, 4);
        let mut assignment = assignment_for(&grid, partition, Vec::new());
        assignment.grid_slice.pop();

        let result = run_pass(assignment);
        assert!(result.updated_owned_rows.is_empty());
    }
}
