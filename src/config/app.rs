//! Main application configuration
//!
//! This module defines the configuration structures for pairwise-ranker,
//! including environment variable and TOML file loading and validation.

use crate::matchmaking::SelectionConfig;
use crate::rating::Glicko2Config;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingSettings,
    pub matchmaking: MatchmakingSettings,
    pub storage: StorageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Glicko-2 settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Volatility constraint
    pub tau: f64,
    /// Volatility solver convergence tolerance
    pub convergence_tolerance: f64,
}

/// Pair selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Minimum rating for HighElo mode
    pub high_elo_threshold: f64,
    /// Minimum rating for EliteTier mode
    pub elite_tier_threshold: f64,
    /// Opponent window half-width in deviations
    pub window_scale: f64,
    /// Seed for opponent selection; random when absent
    pub seed: Option<u64>,
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one ratings document per dataset
    pub data_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pairwise-ranker".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        let defaults = Glicko2Config::default();
        Self {
            tau: defaults.tau,
            convergence_tolerance: defaults.convergence_tolerance,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        let defaults = SelectionConfig::default();
        Self {
            high_elo_threshold: defaults.high_elo_threshold,
            elite_tier_threshold: defaults.elite_tier_threshold,
            window_scale: defaults.window_scale,
            seed: None,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".pairwise-ranker"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(tau) = env::var("RATING_TAU") {
            self.rating.tau = tau
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_TAU value: {}", tau))?;
        }
        if let Ok(tolerance) = env::var("RATING_CONVERGENCE_TOLERANCE") {
            self.rating.convergence_tolerance = tolerance.parse().map_err(|_| {
                anyhow!("Invalid RATING_CONVERGENCE_TOLERANCE value: {}", tolerance)
            })?;
        }

        // Matchmaking settings
        if let Ok(threshold) = env::var("HIGH_ELO_THRESHOLD") {
            self.matchmaking.high_elo_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("Invalid HIGH_ELO_THRESHOLD value: {}", threshold))?;
        }
        if let Ok(threshold) = env::var("ELITE_TIER_THRESHOLD") {
            self.matchmaking.elite_tier_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("Invalid ELITE_TIER_THRESHOLD value: {}", threshold))?;
        }
        if let Ok(scale) = env::var("WINDOW_SCALE") {
            self.matchmaking.window_scale = scale
                .parse()
                .map_err(|_| anyhow!("Invalid WINDOW_SCALE value: {}", scale))?;
        }
        if let Ok(seed) = env::var("SELECTION_SEED") {
            self.matchmaking.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("Invalid SELECTION_SEED value: {}", seed))?,
            );
        }

        // Storage settings
        if let Ok(dir) = env::var("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Glicko-2 engine configuration
    pub fn glicko2(&self) -> Glicko2Config {
        Glicko2Config {
            tau: self.rating.tau,
            convergence_tolerance: self.rating.convergence_tolerance,
        }
    }

    /// Pair selection configuration
    pub fn selection(&self) -> SelectionConfig {
        SelectionConfig {
            high_elo_threshold: self.matchmaking.high_elo_threshold,
            elite_tier_threshold: self.matchmaking.elite_tier_threshold,
            window_scale: self.matchmaking.window_scale,
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    config.glicko2().validate()?;
    config.selection().validate()?;

    if config.storage.data_dir.as_os_str().is_empty() {
        return Err(anyhow!("Data directory cannot be empty"));
    }

    Ok(())
}
