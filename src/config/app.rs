//! Main application configuration
//!
//! Configuration comes from a TOML file, from environment variables, or from
//! defaults matching the production ten-player pool.

use crate::config::rating::RatingConfig;
use crate::rating::TrueSkillRatingModel;
use crate::team::{BalanceWeights, MatchmakingEngine, RolePolicy, RoleRequirement};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Queue that sessions pull their pool from
    pub queue_name: String,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    pub offense_needed: usize,
    pub chase_needed: usize,
    pub home_needed: usize,
    /// Reshuffles allowed per session after the first formation
    pub max_reshuffles: u32,
    /// Let overflow specialists fill other roles at a scoring penalty
    pub allow_off_role: bool,
    pub uncertainty_weight: f64,
    pub role_mismatch_weight: f64,
    pub quality_weight: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pickup-room".to_string(),
            log_level: "info".to_string(),
            queue_name: "pickup".to_string(),
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        let requirement = RoleRequirement::default();
        let weights = BalanceWeights::default();
        Self {
            offense_needed: requirement.offense,
            chase_needed: requirement.chase,
            home_needed: requirement.home,
            max_reshuffles: 3,
            allow_off_role: false,
            uncertainty_weight: weights.uncertainty,
            role_mismatch_weight: weights.role_mismatch,
            quality_weight: weights.quality,
        }
    }
}

impl MatchmakingSettings {
    pub fn role_requirement(&self) -> RoleRequirement {
        RoleRequirement::new(self.offense_needed, self.chase_needed, self.home_needed)
    }

    pub fn role_policy(&self) -> RolePolicy {
        if self.allow_off_role {
            RolePolicy::AllowOffRole
        } else {
            RolePolicy::Strict
        }
    }

    pub fn balance_weights(&self) -> BalanceWeights {
        BalanceWeights {
            uncertainty: self.uncertainty_weight,
            role_mismatch: self.role_mismatch_weight,
            quality: self.quality_weight,
        }
    }
}

/// Parse an optional variable, naming it in the error
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
        })
        .transpose()
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(name) = lookup("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Some(log_level) = lookup("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Some(queue) = lookup("QUEUE_NAME") {
            config.service.queue_name = queue;
        }

        let matchmaking = &mut config.matchmaking;
        if let Some(count) = parse_var(&lookup, "NUM_OFFENSE_NEEDED")? {
            matchmaking.offense_needed = count;
        }
        if let Some(count) = parse_var(&lookup, "NUM_CHASE_NEEDED")? {
            matchmaking.chase_needed = count;
        }
        if let Some(count) = parse_var(&lookup, "NUM_HOME_NEEDED")? {
            matchmaking.home_needed = count;
        }
        if let Some(limit) = parse_var(&lookup, "MAX_RESHUFFLES")? {
            matchmaking.max_reshuffles = limit;
        }
        if let Some(allow) = parse_var(&lookup, "ALLOW_OFF_ROLE")? {
            matchmaking.allow_off_role = allow;
        }
        if let Some(weight) = parse_var(&lookup, "UNCERTAINTY_WEIGHT")? {
            matchmaking.uncertainty_weight = weight;
        }
        if let Some(weight) = parse_var(&lookup, "ROLE_MISMATCH_WEIGHT")? {
            matchmaking.role_mismatch_weight = weight;
        }
        if let Some(weight) = parse_var(&lookup, "QUALITY_WEIGHT")? {
            matchmaking.quality_weight = weight;
        }

        let rating = &mut config.rating;
        if let Some(value) = parse_var(&lookup, "RATING_INITIAL_MEAN")? {
            rating.initial_rating = value;
        }
        if let Some(value) = parse_var(&lookup, "RATING_INITIAL_UNCERTAINTY")? {
            rating.initial_uncertainty = value;
        }
        if let Some(value) = parse_var(&lookup, "RATING_BETA")? {
            rating.beta = value;
        }
        if let Some(value) = parse_var(&lookup, "RATING_DRAW_PROBABILITY")? {
            rating.draw_probability = value;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Build the engine this configuration describes
    pub fn build_engine(&self) -> Result<MatchmakingEngine> {
        let model = TrueSkillRatingModel::new(self.rating.to_trueskill_config())?;

        Ok(MatchmakingEngine::new(
            self.matchmaking.role_requirement(),
            self.matchmaking.role_policy(),
            self.matchmaking.balance_weights(),
            Arc::new(model),
        )?)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.queue_name.is_empty() {
        return Err(anyhow!("Queue name cannot be empty"));
    }

    config.matchmaking.role_requirement().validate()?;

    let weights = config.matchmaking.balance_weights();
    for (name, value) in [
        ("Uncertainty weight", weights.uncertainty),
        ("Role mismatch weight", weights.role_mismatch),
        ("Quality weight", weights.quality),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("{} must be a non-negative number", name));
        }
    }

    config.rating.to_trueskill_config().validate()?;

    Ok(())
}
