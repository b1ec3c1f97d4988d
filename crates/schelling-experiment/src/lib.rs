//! Schelling Experiment: CLI harness around the segregation kernel.
//!
//! This crate loads run configurations, drives single runs and parameter
//! sweeps (threshold × worker count × trials), and records timing and
//! convergence results as JSON.

pub mod config;
pub mod results;
pub mod runner;
