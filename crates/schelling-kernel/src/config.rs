//! Configuration types for the simulation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::grid::AgentId;

/// Smallest fabric that can run the protocol: one coordinator plus two workers.
pub const MIN_PROCESS_COUNT: usize = 3;

/// Rank reserved for the coordinator. Workers occupy `1..=worker_count`.
pub const COORDINATOR_RANK: usize = 0;

/// Top-level simulation configuration.
///
/// Passed explicitly into the coordinator and every worker pass.
/// Loaded from TOML/JSON by the experiment harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid rows
    pub height: usize,

    /// Grid columns
    pub width: usize,

    /// Percentage of cells left empty at initialization (0-100)
    pub empty_percent: u8,

    /// Minimum share of same-type occupied neighbors, in percent (0-100)
    pub satisfaction_threshold_percent: u8,

    /// Upper bound on executed rounds
    pub max_rounds: usize,

    /// Number of worker ranks (the fabric has `worker_count + 1` processes)
    pub worker_count: usize,

    /// Base seed for population and worker passes (None for entropy)
    pub seed: Option<u64>,

    /// Optional reply timeout per round. None blocks forever on a silent worker.
    pub reply_timeout_ms: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            height: 40,
            width: 40,
            empty_percent: 30,
            satisfaction_threshold_percent: 30,
            max_rounds: 1000,
            worker_count: 3,
            seed: None,
            reply_timeout_ms: None,
        }
    }
}

impl SimulationConfig {
    /// Coordinator plus workers.
    pub fn process_count(&self) -> usize {
        self.worker_count + 1
    }

    /// Total number of cells in the grid. Saturates for grids `validate` rejects.
    pub fn capacity(&self) -> usize {
        self.height.saturating_mul(self.width)
    }

    /// Number of agents to place, derived from the empty-cell percentage.
    pub fn agent_count(&self) -> usize {
        self.capacity()
            .saturating_mul(100 - usize::from(self.empty_percent.min(100)))
            / 100
    }

    /// Check the startup preconditions.
    ///
    /// Fabric size and grid height are checked first, so a fabric that is
    /// too small is always reported as such.
    pub fn validate(&self) -> Result<()> {
        if self.process_count() < MIN_PROCESS_COUNT {
            return Err(SimulationError::FabricTooSmall {
                process_count: self.process_count(),
                required: MIN_PROCESS_COUNT,
            });
        }
        if self.height < self.worker_count {
            return Err(SimulationError::GridTooShort {
                height: self.height,
                worker_count: self.worker_count,
            });
        }
        if self.width == 0 {
            return Err(SimulationError::InvalidConfig(
                "width must be at least 1".to_string(),
            ));
        }
        match self.height.checked_mul(self.width) {
            Some(cells) if cells <= AgentId::MAX as usize => {}
            _ => {
                return Err(SimulationError::InvalidConfig(format!(
                    "a {}x{} grid exceeds the {} cells agent ids can address",
                    self.height,
                    self.width,
                    AgentId::MAX
                )));
            }
        }
        if self.empty_percent > 100 {
            return Err(SimulationError::InvalidConfig(format!(
                "empty_percent {} exceeds 100",
                self.empty_percent
            )));
        }
        if self.satisfaction_threshold_percent > 100 {
            return Err(SimulationError::InvalidConfig(format!(
                "satisfaction_threshold_percent {} exceeds 100",
                self.satisfaction_threshold_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_run() {
        let config = SimulationConfig::default();
        assert_eq!(config.process_count(), 4);
        assert_eq!(config.agent_count(), 1120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_two_process_fabric_rejected() {
        let config = SimulationConfig {
            worker_count: 1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimulationError::FabricTooSmall {
                process_count: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_grid_shorter_than_workers_rejected() {
        let config = SimulationConfig {
            height: 3,
            worker_count: 4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::GridTooShort {
                height: 3,
                worker_count: 4
            })
        ));
    }

    #[test]
    fn test_threshold_above_hundred_rejected() {
        let config = SimulationConfig {
            satisfaction_threshold_percent: 101,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let overflowing = SimulationConfig {
            height: usize::MAX,
            width: 2,
            ..Default::default()
        };
        assert!(matches!(
            overflowing.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        let beyond_ids = SimulationConfig {
            height: 70_000,
            width: 70_000,
            ..Default::default()
        };
        assert!(matches!(
            beyond_ids.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        let beyond_ids = SimulationConfig {
            height: 2,
            width: AgentId::MAX as usize,
            worker_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            beyond_ids.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        // The banner reads these before validation runs
        assert_eq!(overflowing.capacity(), usize::MAX);
        assert!(overflowing.agent_count() < usize::MAX);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"height": 10, "worker_count": 2}"#).unwrap();
        assert_eq!(config.height, 10);
        assert_eq!(config.width, 40);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.reply_timeout_ms, None);
    }
}
