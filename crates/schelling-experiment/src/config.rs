//! Configuration loading for the experiment CLI.
//!
//! A run starts from `SimulationConfig::default()`, optionally replaced by a
//! TOML or JSON file, then individual CLI flags override single fields.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;

use schelling_kernel::SimulationConfig;

/// Load a configuration file; the format is picked from the extension.
///
/// Fields missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase);
    let config = match ext.as_deref() {
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("parsing TOML config {}", path.display()))?,
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("parsing JSON config {}", path.display()))?,
        _ => bail!(
            "Unsupported config format: {}. Valid: .toml, .json",
            path.display()
        ),
    };
    Ok(config)
}

/// Per-field overrides taken from the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Grid height (rows)
    #[arg(long)]
    pub height: Option<usize>,

    /// Grid width (columns)
    #[arg(long)]
    pub width: Option<usize>,

    /// Percentage of cells left empty
    #[arg(long = "empty")]
    pub empty_percent: Option<u8>,

    /// Satisfaction threshold percentage
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Maximum rounds
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Number of worker ranks
    #[arg(long)]
    pub workers: Option<usize>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fail a round when a worker has not replied within this many milliseconds
    #[arg(long = "reply-timeout-ms")]
    pub reply_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Apply every flag that was given.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(empty_percent) = self.empty_percent {
            config.empty_percent = empty_percent;
        }
        if let Some(threshold) = self.threshold {
            config.satisfaction_threshold_percent = threshold;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.reply_timeout_ms.is_some() {
            config.reply_timeout_ms = self.reply_timeout_ms;
        }
    }
}

/// Resolve the effective configuration from an optional file plus overrides.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<SimulationConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}
