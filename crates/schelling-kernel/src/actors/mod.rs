//! Acton-reactive actors for the compute fabric.
//!
//! ```text
//! RoundCoordinator (rank 0)
//!   ├─ Directive::Continue (fan-out) → WorkerActor 1..=N
//!   │   └─ SliceResult → ResultCollector → mpsc → RoundCoordinator
//!   └─ Directive::Stop (broadcast) → WorkerActor 1..=N
//! ```
//!
//! Each WorkerActor handles directives through its mailbox one at a time, so a
//! worker's buffer is only ever touched by that worker.

mod collector;
mod worker;

pub use collector::{ResultCollector, ResultCollectorState};
pub use worker::{WorkerActor, WorkerActorState, run_pass};
