//! Price update submission

use alloy_primitives::B256;
use std::sync::Arc;
use tracing::{error, info};

use oracle_core::{cents_to_usd, retry, ExecutionError, ExecutionResult, OracleConfig};
use crate::builder::{format_ether, PriceUpdateTx, TransactionBuilder};
use crate::chain::{ChainClient, UpdateReceipt};

/// Sends price updates to the oracle contract
pub struct UpdatePublisher {
    client: Arc<dyn ChainClient>,
    builder: TransactionBuilder,
    password: String,
}

impl UpdatePublisher {
    pub fn new(client: Arc<dyn ChainClient>, builder: TransactionBuilder, password: String) -> Self {
        Self {
            client,
            builder,
            password,
        }
    }

    pub fn from_config(client: Arc<dyn ChainClient>, config: &OracleConfig, gas_limit: u64) -> Self {
        Self::new(
            client,
            TransactionBuilder::from_config(config).with_gas_limit(gas_limit),
            config.account_password.clone(),
        )
    }

    /// Build the update transaction at the current gas price estimate
    pub async fn build_transaction(&self, cents: u64) -> ExecutionResult<PriceUpdateTx> {
        let gas_price = self.client.estimate_gas_price().await?;
        Ok(self.builder.build(cents, gas_price))
    }

    /// Build the update at the current gas price and broadcast it
    pub async fn submit_price_update(&self, cents: u64) -> ExecutionResult<B256> {
        let tx = self.build_transaction(cents).await?;

        info!(
            "Sending price update: {} cost: {} ETH",
            cents_to_usd(cents),
            format_ether(tx.cost())
        );

        self.client.submit_transaction(&tx, &self.password).await
    }

    /// Wait for a broadcast update to be mined. A receipt without any log
    /// entries means the contract rejected the update.
    pub async fn confirm_price_update(&self, cents: u64, tx_hash: B256) -> ExecutionResult<UpdateReceipt> {
        let receipt = self.client.await_confirmation(tx_hash).await?;

        if receipt.log_count == 0 {
            return Err(ExecutionError::UpdateFailed);
        }

        info!(
            "Update to {} in tx: {} was successful.",
            cents_to_usd(cents),
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// Submit one update and wait for it to be mined
    pub async fn send_price_update(&self, cents: u64) -> ExecutionResult<UpdateReceipt> {
        let tx_hash = self.submit_price_update(cents).await?;
        self.confirm_price_update(cents, tx_hash).await
    }

    /// Send an update and swallow any failure so the caller's loop keeps
    /// running. Only gas estimation and broadcast are retried; once a
    /// transaction is on the wire it is never resent.
    pub async fn publish(&self, cents: u64) -> Option<UpdateReceipt> {
        let Some(tx_hash) = retry("price update", || self.submit_price_update(cents)).await else {
            error!("Giving up on price update to {}", cents_to_usd(cents));
            return None;
        };

        match self.confirm_price_update(cents, tx_hash).await {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                error!("Update to {} in tx: {} failed: {}", cents_to_usd(cents), tx_hash, e);
                None
            }
        }
    }
}
