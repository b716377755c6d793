//! Startup context, built once and handed to the components

use std::sync::Arc;

use oracle_core::{OracleConfig, OracleSettings, RuntimeSettings};
use oracle_executor::{ChainClientConfig, JsonRpcClient, UpdatePublisher};
use oracle_price_feed::{default_sources, http_client, PriceAggregator};

use crate::oracle::{OracleError, PriceOracle};
use crate::policy::UpdatePolicy;

#[derive(Debug, Clone)]
pub struct OracleContext {
    pub config: OracleConfig,
    pub settings: OracleSettings,
    pub runtime: RuntimeSettings,
}

impl OracleContext {
    pub fn new(config: OracleConfig, runtime: RuntimeSettings) -> Self {
        Self {
            config,
            settings: OracleSettings::default(),
            runtime,
        }
    }

    /// Read required keys and optional settings from the environment
    pub fn load() -> Result<Self, OracleError> {
        let runtime = RuntimeSettings::load()?;
        let config = OracleConfig::from_env()?;
        Ok(Self::new(config, runtime))
    }

    /// Wire feeds, chain client and publisher into a poll loop
    pub fn build_oracle(&self) -> anyhow::Result<PriceOracle> {
        let sources = default_sources(http_client()?);
        let aggregator =
            PriceAggregator::new(sources).with_smoothing_factor(self.settings.smoothing_factor);

        let chain = JsonRpcClient::new(ChainClientConfig::new(self.runtime.rpc_url.clone()))?;
        let publisher =
            UpdatePublisher::from_config(Arc::new(chain), &self.config, self.settings.gas_limit);

        Ok(PriceOracle::new(
            aggregator,
            publisher,
            UpdatePolicy::from_settings(&self.settings),
        ))
    }
}
