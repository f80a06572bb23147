//! Regulatory parameters and ledger behaviour switches.
//!
//! Every value is adjustable. Defaults follow the 2025 FuelEU Maritime
//! figures; a JSON file may override any subset of them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Fixed regulatory constants used by the balance formula and banking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatoryParams {
    /// Target GHG intensity in gCO2e/MJ.
    pub target_intensity: Decimal,
    /// Energy content of one tonne of fuel, in MJ.
    pub energy_per_tonne: Decimal,
    /// Years a banked surplus stays usable after its origin year.
    pub banking_horizon_years: i32,
    /// Share of the annual balance that may be borrowed. Carried for
    /// completeness; borrowing is not modelled.
    pub max_borrowing_fraction: Decimal,
}

impl Default for RegulatoryParams {
    fn default() -> Self {
        Self {
            target_intensity: dec!(89.3368),
            energy_per_tonne: dec!(41000),
            banking_horizon_years: 3,
            max_borrowing_fraction: dec!(0.05),
        }
    }
}

impl RegulatoryParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_intensity <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "target_intensity must be positive, got {}",
                self.target_intensity
            )));
        }
        if self.energy_per_tonne <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "energy_per_tonne must be positive, got {}",
                self.energy_per_tonne
            )));
        }
        if self.banking_horizon_years < 1 {
            return Err(ConfigError::Invalid(format!(
                "banking_horizon_years must be at least 1, got {}",
                self.banking_horizon_years
            )));
        }
        if self.max_borrowing_fraction < Decimal::ZERO || self.max_borrowing_fraction > Decimal::ONE
        {
            return Err(ConfigError::Invalid(format!(
                "max_borrowing_fraction must be within [0, 1], got {}",
                self.max_borrowing_fraction
            )));
        }
        Ok(())
    }
}

/// What `compute_balance` does when a record for (ship, year) already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputePolicy {
    /// Overwrite balance and status of the existing record, keeping its id.
    #[default]
    Upsert,
    /// Always insert a fresh record; the store rejects the duplicate.
    Append,
}

/// Top-level configuration of the compliance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub params: RegulatoryParams,
    pub recompute_policy: RecomputePolicy,
    /// Give deficit ships past the greedy cut-off a member row with zero
    /// allocation instead of leaving them out of the pool's member list.
    pub record_uncovered_deficits: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            params: RegulatoryParams::default(),
            recompute_policy: RecomputePolicy::default(),
            record_uncovered_deficits: true,
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.params.target_intensity, dec!(89.3368));
        assert_eq!(config.params.energy_per_tonne, dec!(41000));
        assert_eq!(config.params.banking_horizon_years, 3);
        assert_eq!(config.recompute_policy, RecomputePolicy::Upsert);
        assert!(config.record_uncovered_deficits);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LedgerConfig::from_json(
            r#"{ "params": { "banking_horizon_years": 5 }, "recompute_policy": "append" }"#,
        )
        .unwrap();
        assert_eq!(config.params.banking_horizon_years, 5);
        assert_eq!(config.params.target_intensity, dec!(89.3368));
        assert_eq!(config.recompute_policy, RecomputePolicy::Append);
    }

    #[test]
    fn test_numeric_and_string_decimals() {
        let config = LedgerConfig::from_json(
            r#"{ "params": { "target_intensity": "91.16", "energy_per_tonne": 40000 } }"#,
        )
        .unwrap();
        assert_eq!(config.params.target_intensity, dec!(91.16));
        assert_eq!(config.params.energy_per_tonne, dec!(40000));
    }

    #[test]
    fn test_invalid_horizon_rejected() {
        let result = LedgerConfig::from_json(r#"{ "params": { "banking_horizon_years": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_target_rejected() {
        let result = LedgerConfig::from_json(r#"{ "params": { "target_intensity": "-1" } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = LedgerConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = LedgerConfig::from_file("/nonexistent/ledger-config.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
