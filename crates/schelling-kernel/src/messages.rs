//! Message types for acton-reactive actor communication.
//!
//! Every round carries a correlation ID (via mti crate) so the coordinator can
//! tell this round's replies apart from anything left over from a stalled one.

use crate::grid::{AgentTypes, Cell};
use crate::optimizer::PassStats;
use crate::partition::Partition;

/// Wire value of the continue flag: 0 = continue, 1 = stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContinueFlag {
    Continue = 0,
    Stop = 1,
}

/// Coordinator -> worker. Sent to each worker once per round, then once to stop.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Continue: run one local pass over the enclosed slice.
    Continue(SliceAssignment),
    /// Stop: no payload follows; the worker leaves its loop.
    Stop,
}

impl Directive {
    pub fn flag(&self) -> ContinueFlag {
        match self {
            Self::Continue(_) => ContinueFlag::Continue,
            Self::Stop => ContinueFlag::Stop,
        }
    }
}

/// The per-round payload for one worker.
#[derive(Debug, Clone)]
pub struct SliceAssignment {
    /// Correlation ID for this round
    pub correlation_id: String,
    /// Round number (1-based)
    pub round: usize,
    /// The receiving worker's partition
    pub partition: Partition,
    /// Grid width, needed to rebuild rows from the flat slice
    pub width: usize,
    /// Owned plus halo rows, row-major
    pub grid_slice: Vec<Cell>,
    /// Agent-type table, identical for every worker and round
    pub agent_types: AgentTypes,
    /// Satisfaction threshold in percent
    pub threshold_percent: u8,
    /// Seed for this worker's pass
    pub seed: u64,
}

/// Worker -> coordinator. The owned rows after one local pass; never halo rows.
#[derive(Debug, Clone)]
pub struct SliceResult {
    /// Correlation ID matching the assignment
    pub correlation_id: String,
    /// Round number echoed from the assignment
    pub round: usize,
    /// Rank of the replying worker
    pub rank: usize,
    /// `owned_row_count * width` cells, row-major
    pub updated_owned_rows: Vec<Cell>,
    /// Counters from the local pass
    pub stats: PassStats,
}
