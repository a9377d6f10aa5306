//! Configuration for the position manager.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable for [`ManagerConfig::min_observation_cardinality`].
pub const ENV_MIN_OBSERVATION_CARDINALITY: &str = "LP_CUSTODY_MIN_OBSERVATION_CARDINALITY";
/// Environment variable for [`ManagerConfig::twap_window_secs`].
pub const ENV_TWAP_WINDOW_SECS: &str = "LP_CUSTODY_TWAP_WINDOW_SECS";
/// Environment variable for [`ManagerConfig::max_batch_size`].
pub const ENV_MAX_BATCH_SIZE: &str = "LP_CUSTODY_MAX_BATCH_SIZE";

/// Error loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Configuration for the position manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Observations the pool must retain before its TWAP is trusted.
    pub min_observation_cardinality: u16,
    /// Window of the time-weighted average price, in seconds.
    pub twap_window_secs: u32,
    /// Maximum number of deposits accepted in one batch.
    pub max_batch_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            min_observation_cardinality: 100,
            twap_window_secs: 3600, // 1 hour
            max_batch_size: 32,
        }
    }
}

impl ManagerConfig {
    /// Loads configuration from the process environment.
    ///
    /// Unset variables keep their default.
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed, or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            min_observation_cardinality: parse_or(
                &lookup,
                ENV_MIN_OBSERVATION_CARDINALITY,
                defaults.min_observation_cardinality,
            )?,
            twap_window_secs: parse_or(&lookup, ENV_TWAP_WINDOW_SECS, defaults.twap_window_secs)?,
            max_batch_size: parse_or(&lookup, ENV_MAX_BATCH_SIZE, defaults.max_batch_size)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.twap_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "twap_window_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
