//! Configuration types

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ConfigError, ConfigResult};

/// Gas limit attached to every price update transaction
pub const GAS_LIMIT: u64 = 35_000;

/// Minimum time between two on-chain updates (2 hours)
pub const TIME_BETWEEN_UPDATES: Duration = Duration::from_secs(2 * 60 * 60);

/// Weight given to the fresh running ratio when blending with the prior estimate
pub const SMOOTHING_FACTOR: f64 = 0.95;

/// Delay between two sampling cycles
pub const POLLING_DELAY: Duration = Duration::from_millis(6_000);

/// Number of cycles to collect before sending the first update
pub const CONVERGENCE_THRESHOLD: u64 = 100;

/// Which bucket of the gas price histogram to target
pub const GAS_PRICE_PERCENTILE: f64 = 0.7;

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Keys that must be present in the process environment
pub const REQUIRED_KEYS: [&str; 3] = ["CONTRACT_ADDRESS", "OWNER_ADDRESS", "ACCOUNT_PASSWORD"];

/// Contract and signer identity, read once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub contract_address: Address,
    pub owner_address: Address,
    pub account_password: String,
}

impl OracleConfig {
    /// Read the required keys from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Keys are checked in `REQUIRED_KEYS` order
    /// and the first missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_KEYS.len());
        for key in REQUIRED_KEYS {
            let value = lookup(key).ok_or(ConfigError::MissingKey(key))?;
            values.push(value);
        }

        let contract_address = parse_address("CONTRACT_ADDRESS", &values[0])?;
        let owner_address = parse_address("OWNER_ADDRESS", &values[1])?;

        Ok(Self {
            contract_address,
            owner_address,
            account_password: values.swap_remove(2),
        })
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("contract_address", &self.contract_address)
            .field("owner_address", &self.owner_address)
            .field("account_password", &"<redacted>")
            .finish()
    }
}

fn parse_address(key: &'static str, value: &str) -> ConfigResult<Address> {
    Address::from_str(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Optional runtime settings (`ORACLE_` prefixed environment variables)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    pub rpc_url: String,
    pub log_format: LogFormat,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl RuntimeSettings {
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(config::Environment::with_prefix("ORACLE"))
    }

    fn load_from(env: config::Environment) -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .set_default("rpc_url", DEFAULT_RPC_URL)
            .and_then(|b| b.set_default("log_format", "pretty"))
            .map_err(|e| ConfigError::Settings(e.to_string()))?
            .add_source(env)
            .build()
            .map_err(|e| ConfigError::Settings(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Settings(e.to_string()))
    }
}

/// Tunables of the sampling and publishing loop
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub gas_limit: u64,
    pub update_interval: Duration,
    pub smoothing_factor: f64,
    pub polling_delay: Duration,
    pub convergence_threshold: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            gas_limit: GAS_LIMIT,
            update_interval: TIME_BETWEEN_UPDATES,
            smoothing_factor: SMOOTHING_FACTOR,
            polling_delay: POLLING_DELAY,
            convergence_threshold: CONVERGENCE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONTRACT: &str = "0x16c5785ac562ff41e2dcfdf829c5a142f1fccd7d";
    const OWNER: &str = "0xb60e8dd61c5d32be8058bb8eb970870f07233155";

    fn env_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_from_lookup() {
        let env = env_with(&[
            ("CONTRACT_ADDRESS", CONTRACT),
            ("OWNER_ADDRESS", OWNER),
            ("ACCOUNT_PASSWORD", "hunter2"),
        ]);

        let config = OracleConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.contract_address, Address::from_str(CONTRACT).unwrap());
        assert_eq!(config.owner_address, Address::from_str(OWNER).unwrap());
        assert_eq!(config.account_password, "hunter2");
    }

    #[test]
    fn test_missing_key_is_named() {
        let err = OracleConfig::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("CONTRACT_ADDRESS"));
        assert_eq!(err.to_string(), "CONTRACT_ADDRESS is missing in environment");

        let env = env_with(&[("CONTRACT_ADDRESS", CONTRACT), ("OWNER_ADDRESS", OWNER)]);
        let err = OracleConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert_eq!(err.to_string(), "ACCOUNT_PASSWORD is missing in environment");
    }

    #[test]
    fn test_invalid_address_rejected() {
        let env = env_with(&[
            ("CONTRACT_ADDRESS", "not-an-address"),
            ("OWNER_ADDRESS", OWNER),
            ("ACCOUNT_PASSWORD", "pw"),
        ]);

        let err = OracleConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CONTRACT_ADDRESS", .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let env = env_with(&[
            ("CONTRACT_ADDRESS", CONTRACT),
            ("OWNER_ADDRESS", OWNER),
            ("ACCOUNT_PASSWORD", "hunter2"),
        ]);
        let config = OracleConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_runtime_settings_defaults() {
        let source = config::Environment::with_prefix("ORACLE_TEST_UNSET_PREFIX");
        let settings = RuntimeSettings::load_from(source).unwrap();
        assert_eq!(settings, RuntimeSettings::default());
    }

    #[test]
    fn test_runtime_settings_override() {
        let mut vars = HashMap::new();
        vars.insert("ORACLE_RPC_URL".to_string(), "http://node:8545".to_string());
        vars.insert("ORACLE_LOG_FORMAT".to_string(), "json".to_string());
        let source = config::Environment::with_prefix("ORACLE").source(Some(vars));

        let settings = RuntimeSettings::load_from(source).unwrap();
        assert_eq!(settings.rpc_url, "http://node:8545");
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_default_settings_use_constants() {
        let settings = OracleSettings::default();
        assert_eq!(settings.gas_limit, 35_000);
        assert_eq!(settings.convergence_threshold, 100);
        assert_eq!(settings.polling_delay, Duration::from_secs(6));
        assert_eq!(settings.update_interval, Duration::from_secs(7200));
    }
}
