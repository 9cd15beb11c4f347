//! Planner configuration loaded from YAML.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Longest cash-flow projection, in months.
pub const MAX_CASH_FLOW_MONTHS: u32 = 120;

/// Tunables for the planner runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Trailing-edge window for coalescing persistence writes, in milliseconds.
    pub persist_debounce_ms: u64,
    /// Session-storage key holding the serialized record.
    pub storage_key: String,
    /// Months simulated by the cash-flow projection.
    pub cash_flow_months: u32,
    /// Projected monthly units used as the margin-of-safety reference.
    pub safety_reference_units: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: 300,
            storage_key: "businessData".to_string(),
            cash_flow_months: 12,
            safety_reference_units: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

impl PlannerConfig {
    /// Parse YAML, filling absent keys from defaults, then validate.
    ///
    /// Example:
    /// let cfg = PlannerConfig::from_yaml_str("cash_flow_months: 24").unwrap();
    /// assert_eq!(cfg.persist_debounce_ms, 300);
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: PlannerConfig = if s.trim().is_empty() {
            PlannerConfig::default()
        } else {
            serde_yaml::from_str(s)?
        };
        cfg.validate()?;
        debug!(?cfg, "planner config loaded");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persist_debounce_ms == 0 {
            return Err(ConfigError::Invalid("persist_debounce_ms must be > 0"));
        }
        if self.cash_flow_months == 0 {
            return Err(ConfigError::Invalid("cash_flow_months must be >= 1"));
        }
        if self.cash_flow_months > MAX_CASH_FLOW_MONTHS {
            return Err(ConfigError::Invalid("cash_flow_months must be <= 120"));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty"));
        }
        Ok(())
    }
}
