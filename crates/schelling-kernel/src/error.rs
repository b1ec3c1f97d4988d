//! Error types for the segregation kernel.

use thiserror::Error;

/// Failures the kernel reports to its caller.
///
/// Precondition failures (`FabricTooSmall`, `GridTooShort`, `InvalidConfig`,
/// `PopulationExceedsCapacity`) are raised before any round is scheduled.
/// The remaining variants can only surface while the round loop is running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("compute fabric has {process_count} processes, at least {required} are required")]
    FabricTooSmall { process_count: usize, required: usize },

    #[error("grid height {height} is smaller than worker count {worker_count}")]
    GridTooShort { height: usize, worker_count: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot place {agent_count} agents on a grid with {capacity} cells")]
    PopulationExceedsCapacity { agent_count: usize, capacity: usize },

    #[error("worker {rank} did not reply within {timeout_ms}ms in round {round}")]
    WorkerStalled {
        rank: usize,
        round: usize,
        timeout_ms: u64,
    },

    #[error("result channel closed while waiting for round {round}")]
    ResultChannelClosed { round: usize },

    #[error("worker {rank} returned a malformed result: {reason}")]
    MalformedResult { rank: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, SimulationError>;
