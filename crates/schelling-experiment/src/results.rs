//! Results collection and output for Schelling experiments.
//!
//! Captures metrics like:
//! - Rounds to convergence
//! - Unsatisfied agents before and after
//! - Relocations per round
//! - Wall-clock time per run

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schelling_kernel::{RoundResult, SimulationConfig, SimulationReport};

/// Results from a single simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Simulation configuration
    pub config: SimulationConfig,
    /// Trial index within a sweep point
    pub trial: usize,
    /// Kernel run id
    pub run_id: Uuid,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Agents on the grid
    pub agent_count: usize,
    /// Unsatisfied agents before the first round
    pub initial_unsatisfied: usize,
    /// Rounds executed
    pub rounds_executed: usize,
    /// Whether every agent ended satisfied
    pub converged: bool,
    /// Unsatisfied agents after the last round
    pub final_unsatisfied: usize,
    /// Relocations summed over all rounds
    pub total_relocated: usize,
    /// Per-round results
    pub rounds: Vec<RoundResult>,
}

impl ExperimentResult {
    /// Build a result from a kernel report plus timing.
    pub fn from_report(
        config: SimulationConfig,
        trial: usize,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        elapsed_ms: u64,
        report: &SimulationReport,
    ) -> Self {
        Self {
            config,
            trial,
            run_id: report.run_id,
            started_at,
            ended_at,
            elapsed_ms,
            agent_count: report.agent_count,
            initial_unsatisfied: report.initial_unsatisfied,
            rounds_executed: report.rounds_executed,
            converged: report.converged,
            final_unsatisfied: report.final_unsatisfied,
            total_relocated: report.rounds.iter().map(|r| r.relocated).sum(),
            rounds: report.rounds.clone(),
        }
    }

    /// Key of the sweep point this result belongs to.
    pub fn config_key(&self) -> String {
        format!(
            "threshold={}:workers={}",
            self.config.satisfaction_threshold_percent, self.config.worker_count
        )
    }

    /// Save the result to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Aggregate results from a sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResults {
    /// All individual results
    pub results: Vec<ExperimentResult>,
    /// Summary statistics by sweep point
    pub summary: BTreeMap<String, SweepSummary>,
}

/// Summary statistics for one sweep point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub config_key: String,
    pub trials: usize,
    /// Share of trials that converged
    pub solve_rate: f64,
    /// Standard error of solve rate: sqrt(p(1-p)/n)
    pub solve_rate_se: f64,
    /// 95% confidence interval for solve rate: (lower, upper)
    pub solve_rate_ci: (f64, f64),
    pub avg_rounds: f64,
    /// Standard error of avg_rounds
    pub avg_rounds_se: f64,
    pub min_rounds: usize,
    pub max_rounds: usize,
    pub avg_final_unsatisfied: f64,
    pub avg_elapsed_ms: f64,
}

impl SweepResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ExperimentResult) {
        self.results.push(result);
    }

    /// Compute summary statistics.
    pub fn compute_summary(&mut self) {
        let mut by_config: BTreeMap<String, Vec<&ExperimentResult>> = BTreeMap::new();
        for result in &self.results {
            by_config.entry(result.config_key()).or_default().push(result);
        }

        let mut summary = BTreeMap::new();
        for (key, results) in by_config {
            let trials = results.len();
            let n = trials as f64;
            let solved_count = results.iter().filter(|r| r.converged).count();
            let solve_rate = solved_count as f64 / n;

            let solve_rate_se = if trials > 1 {
                (solve_rate * (1.0 - solve_rate) / n).sqrt()
            } else {
                0.0
            };

            // p ± 1.96 * SE, clamped to [0, 1]
            let z = 1.96;
            let solve_rate_ci = (
                (solve_rate - z * solve_rate_se).max(0.0),
                (solve_rate + z * solve_rate_se).min(1.0),
            );

            let rounds: Vec<usize> = results.iter().map(|r| r.rounds_executed).collect();
            let avg_rounds = rounds.iter().sum::<usize>() as f64 / n;
            let avg_rounds_se = if trials > 1 {
                let variance = rounds
                    .iter()
                    .map(|&r| (r as f64 - avg_rounds).powi(2))
                    .sum::<f64>()
                    / (n - 1.0);
                variance.sqrt() / n.sqrt()
            } else {
                0.0
            };

            let avg_final_unsatisfied =
                results.iter().map(|r| r.final_unsatisfied).sum::<usize>() as f64 / n;
            let avg_elapsed_ms = results.iter().map(|r| r.elapsed_ms).sum::<u64>() as f64 / n;

            summary.insert(
                key.clone(),
                SweepSummary {
                    config_key: key,
                    trials,
                    solve_rate,
                    solve_rate_se,
                    solve_rate_ci,
                    avg_rounds,
                    avg_rounds_se,
                    min_rounds: rounds.iter().copied().min().unwrap_or(0),
                    max_rounds: rounds.iter().copied().max().unwrap_or(0),
                    avg_final_unsatisfied,
                    avg_elapsed_ms,
                },
            );
        }
        self.summary = summary;
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(
        threshold: u8,
        workers: usize,
        trial: usize,
        rounds: usize,
        converged: bool,
    ) -> ExperimentResult {
        ExperimentResult {
            config: SimulationConfig {
                satisfaction_threshold_percent: threshold,
                worker_count: workers,
                ..Default::default()
            },
            trial,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            elapsed_ms: 10,
            agent_count: 100,
            initial_unsatisfied: 40,
            rounds_executed: rounds,
            converged,
            final_unsatisfied: if converged { 0 } else { 3 },
            total_relocated: 60,
            rounds: vec![],
        }
    }

    #[test]
    fn test_sweep_summary() {
        let mut results = SweepResults::new();
        for trial in 0..3 {
            results.add(result(30, 2, trial, 10 + trial, trial < 2));
        }
        results.add(result(50, 4, 0, 7, true));

        results.compute_summary();
        assert_eq!(results.summary.len(), 2);

        let summary = &results.summary["threshold=30:workers=2"];
        assert_eq!(summary.trials, 3);
        assert!((summary.solve_rate - 0.666).abs() < 0.01);
        assert!(summary.solve_rate_se > 0.0);
        assert!(summary.solve_rate_ci.0 <= summary.solve_rate);
        assert!(summary.solve_rate_ci.1 >= summary.solve_rate);
        assert!((summary.avg_rounds - 11.0).abs() < f64::EPSILON);
        assert_eq!(summary.min_rounds, 10);
        assert_eq!(summary.max_rounds, 12);
        assert!((summary.avg_final_unsatisfied - 1.0).abs() < f64::EPSILON);

        let single = &results.summary["threshold=50:workers=4"];
        assert_eq!(single.trials, 1);
        assert_eq!(single.solve_rate_se, 0.0);
        assert_eq!(single.solve_rate_ci, (1.0, 1.0));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");

        let mut results = SweepResults::new();
        results.add(result(30, 3, 0, 4, true));
        results.compute_summary();
        results.save(&path).unwrap();

        let loaded = SweepResults::load(&path).unwrap();
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].run_id, results.results[0].run_id);
        assert!(loaded.summary.contains_key("threshold=30:workers=3"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
    }
}
