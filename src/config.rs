//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default, so an empty (or absent) file yields the
//! reference negotiation behaviour.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::clock::DEFAULT_HISTORY_CAPACITY;
use crate::strategy::scorer::ScorerConfig;
use crate::strategy::search::DEFAULT_SAMPLE_COUNT;
use crate::strategy::AcceptanceConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Seed for the counter-offer search; entropy when absent.
    pub rng_seed: Option<u64>,
    /// Used when the session settings carry no `storage_dir` parameter.
    pub default_storage_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "PARLEY-001".to_string(),
            rng_seed: None,
            default_storage_dir: PathBuf::from("storage"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    pub alpha: f64,
    pub epsilon: f64,
    pub sample_count: usize,
    pub initial_threshold: f64,
    pub final_threshold: f64,
    pub floor_utility: f64,
    pub floor_pressure: f64,
    pub max_accept_pressure: f64,
    pub damped_pressure_cap: f64,
    pub min_history_sessions: usize,
    pub history_capacity: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let scorer = ScorerConfig::default();
        let acceptance = AcceptanceConfig::default();
        Self {
            alpha: scorer.alpha,
            epsilon: scorer.epsilon,
            sample_count: DEFAULT_SAMPLE_COUNT,
            initial_threshold: acceptance.initial_threshold,
            final_threshold: acceptance.final_threshold,
            floor_utility: acceptance.floor_utility,
            floor_pressure: acceptance.floor_pressure,
            max_accept_pressure: acceptance.max_accept_pressure,
            damped_pressure_cap: acceptance.damped_pressure_cap,
            min_history_sessions: acceptance.min_history_sessions,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl StrategyConfig {
    pub fn scorer(&self) -> ScorerConfig {
        ScorerConfig {
            alpha: self.alpha,
            epsilon: self.epsilon,
        }
    }

    pub fn acceptance(&self) -> AcceptanceConfig {
        AcceptanceConfig {
            initial_threshold: self.initial_threshold,
            final_threshold: self.final_threshold,
            floor_utility: self.floor_utility,
            floor_pressure: self.floor_pressure,
            max_accept_pressure: self.max_accept_pressure,
            damped_pressure_cap: self.damped_pressure_cap,
            min_history_sessions: self.min_history_sessions,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        anyhow::ensure!(
            config.strategy.epsilon > 0.0,
            "strategy.epsilon must be positive"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&config.strategy.alpha),
            "strategy.alpha must lie in [0, 1]"
        );
        Ok(config)
    }
}
