//! Schelling Kernel: Partitioned Segregation Rounds over a Worker Fabric
//!
//! This crate runs the Schelling segregation model on a 2-D grid split into
//! horizontal strips. A coordinator owns the authoritative grid; each worker
//! optimizes its strip using a read-only halo of neighboring rows, and the
//! coordinator merges the strips back and checks global satisfaction.

pub mod actors;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod messages;
pub mod optimizer;
pub mod partition;
pub mod satisfaction;
pub mod simulation;

pub use config::SimulationConfig;
pub use coordinator::{CoordinatorOutcome, CoordinatorPhase, RoundCoordinator, RoundResult};
pub use error::{Result, SimulationError};
pub use grid::{AgentId, AgentType, AgentTypes, Cell, Grid, GridStore};
pub use messages::{ContinueFlag, Directive, SliceAssignment, SliceResult};
pub use optimizer::{LocalBuffer, PassStats, optimize};
pub use partition::{
    HaloPolicy, Partition, compute_halo_policy, compute_owned_range, partition_rows,
};
pub use satisfaction::{NeighborCounts, all_satisfied, is_satisfied, unsatisfied_count};
pub use simulation::{Simulation, SimulationOutcome, SimulationReport};
