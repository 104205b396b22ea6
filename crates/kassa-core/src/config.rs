//! TOML-driven ledger configuration.
//!
//! ```toml
//! max_transition_retries = 3
//! default_currency = "EUR"
//!
//! [fiscal]
//! strict = false
//! ```
//!
//! Every field has a sensible default; an empty string parses to the
//! defaults. Malformed TOML or invalid values surface as
//! `KassaError::ConfigError`.

use std::path::Path;

use serde::Deserialize;

use kassa_contracts::error::{KassaError, KassaResult};

/// Behavior of the explicit fiscalization operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiscalConfig {
    /// When true, `tse_start`/`tse_finish` propagate device failures
    /// instead of logging and recording them. The implicit fiscalization
    /// after `confirm_paid` never reverts a payment regardless.
    pub strict: bool,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self { strict: false }
    }
}

/// Runtime configuration for the transaction ledger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on optimistic-write retries per operation. Must be at
    /// least 1.
    pub max_transition_retries: u32,

    /// Currency assumed by callers that do not specify one.
    pub default_currency: String,

    pub fiscal: FiscalConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_transition_retries: 3,
            default_currency: "EUR".to_string(),
            fiscal: FiscalConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(input: &str) -> KassaResult<Self> {
        let config: LedgerConfig = toml::from_str(input).map_err(|e| KassaError::ConfigError {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a configuration file.
    pub fn from_file(path: &Path) -> KassaResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| KassaError::ConfigError {
            reason: format!("failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> KassaResult<()> {
        if self.max_transition_retries == 0 {
            return Err(KassaError::ConfigError {
                reason: "max_transition_retries must be at least 1".to_string(),
            });
        }
        if self.default_currency.is_empty() {
            return Err(KassaError::ConfigError {
                reason: "default_currency must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
