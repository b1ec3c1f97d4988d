//! ResultCollector: funnels worker replies into the coordinator's channel.
//!
//! Workers only know actor handles, while the coordinator drains a plain mpsc
//! receiver between rounds. The collector sits in between and forwards every
//! `SliceResult` unchanged, in mailbox order.

use acton_reactive::prelude::*;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{trace, warn};

use crate::messages::SliceResult;

/// Collector bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct ResultCollectorState {
    /// Replies received from workers over the run
    pub received: usize,
}

/// Actor that forwards `SliceResult` replies to the coordinator.
pub struct ResultCollector {
    tx: mpsc::Sender<SliceResult>,
}

impl ResultCollector {
    /// Create a collector forwarding into `tx`.
    pub fn new(tx: mpsc::Sender<SliceResult>) -> Self {
        Self { tx }
    }

    /// Spawn the actor in the runtime.
    ///
    /// Returns the handle workers should reply to.
    pub async fn spawn(self, runtime: &mut ActorRuntime) -> ActorHandle {
        let mut actor =
            runtime.new_actor_with_name::<ResultCollectorState>("ResultCollector".to_string());
        let tx = self.tx;

        actor.mutate_on::<SliceResult>(move |actor, context| {
            let result = context.message().clone();
            let tx = tx.clone();
            actor.model.received += 1;
            trace!(
                rank = result.rank,
                round = result.round,
                received = actor.model.received,
                "Forwarding reply"
            );

            Reply::pending(async move {
                if let Err(SendError(result)) = tx.send(result).await {
                    warn!(
                        rank = result.rank,
                        round = result.round,
                        correlation_id = %result.correlation_id,
                        "Coordinator has finished; dropping reply"
                    );
                }
            })
        });

        actor.start().await
    }
}
