//! Chain client - JSON-RPC access to the Ethereum node

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use oracle_core::{ExecutionError, ExecutionResult, GAS_PRICE_PERCENTILE};
use crate::builder::PriceUpdateTx;

/// Mined transaction summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub log_count: usize,
}

/// Node operations the publisher relies on
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn estimate_gas_price(&self) -> ExecutionResult<U256>;
    async fn submit_transaction(&self, tx: &PriceUpdateTx, password: &str) -> ExecutionResult<B256>;
    async fn await_confirmation(&self, tx_hash: B256) -> ExecutionResult<UpdateReceipt>;
}

/// Gas price histogram as reported by `parity_gasPriceHistogram`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceHistogram {
    pub bucket_bounds: Vec<String>,
    pub counts: Vec<u64>,
}

/// Pick the bucket median at `percentile` of the histogram.
///
/// Bucket `i` spans `[bounds[i], bounds[i + 1] - 1]`, the last one is closed
/// at `bounds[n]`.
pub fn percentile_gas_price(histogram: &GasPriceHistogram, percentile: f64) -> ExecutionResult<U256> {
    let buckets = histogram.counts.len();
    if buckets == 0 {
        return Err(ExecutionError::EmptyGasHistory);
    }
    if histogram.bucket_bounds.len() != buckets + 1 {
        return Err(ExecutionError::MalformedResponse(format!(
            "{} bucket bounds for {} buckets",
            histogram.bucket_bounds.len(),
            buckets
        )));
    }

    let bounds = histogram
        .bucket_bounds
        .iter()
        .map(|b| parse_quantity(b))
        .collect::<ExecutionResult<Vec<U256>>>()?;

    let index = ((buckets - 1) as f64 * percentile).floor() as usize;
    let start = bounds[index];
    let end = if index == buckets - 1 {
        bounds[index + 1]
    } else {
        bounds[index + 1].saturating_sub(U256::from(1u64))
    };

    Ok((start + end) / U256::from(2u64))
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(raw: &str) -> ExecutionResult<U256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    U256::from_str_radix(digits, 16)
        .map_err(|e| ExecutionError::MalformedResponse(format!("bad quantity {raw}: {e}")))
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    #[serde(default)]
    logs: Vec<Value>,
}

impl RawReceipt {
    fn into_receipt(self) -> ExecutionResult<UpdateReceipt> {
        let transaction_hash = B256::from_str(&self.transaction_hash)
            .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;
        let block_number = match self.block_number {
            Some(raw) => Some(parse_quantity(&raw)?.as_limbs()[0]),
            None => None,
        };

        Ok(UpdateReceipt {
            transaction_hash,
            block_number,
            log_count: self.logs.len(),
        })
    }
}

/// Chain client configuration
#[derive(Debug, Clone)]
pub struct ChainClientConfig {
    pub rpc_url: String,
    pub request_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl ChainClientConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            request_timeout: Duration::from_secs(30),
            receipt_poll_interval: Duration::from_secs(4),
            confirmation_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// HTTP JSON-RPC client for a Parity/OpenEthereum node
pub struct JsonRpcClient {
    config: ChainClientConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: ChainClientConfig) -> ExecutionResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExecutionError::Rpc(e.to_string()))?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> ExecutionResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("RPC {} (id {})", method, id);

        let response: RpcResponse = self
            .http
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutionError::Rpc(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| ExecutionError::MalformedResponse(format!("{method}: {e}")))?;

        if let Some(err) = response.error {
            return Err(ExecutionError::Rpc(format!(
                "{method} failed ({}): {}",
                err.code, err.message
            )));
        }

        Ok(response.result)
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> ExecutionResult<Option<UpdateReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;
        raw.into_receipt().map(Some)
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn estimate_gas_price(&self) -> ExecutionResult<U256> {
        let result = self.call("parity_gasPriceHistogram", json!([])).await?;
        let histogram: GasPriceHistogram = serde_json::from_value(result)
            .map_err(|e| ExecutionError::MalformedResponse(e.to_string()))?;

        percentile_gas_price(&histogram, GAS_PRICE_PERCENTILE)
    }

    async fn submit_transaction(&self, tx: &PriceUpdateTx, password: &str) -> ExecutionResult<B256> {
        let result = self
            .call("personal_sendTransaction", json!([tx.to_rpc_json(), password]))
            .await?;

        let hash = result
            .as_str()
            .ok_or_else(|| ExecutionError::MalformedResponse(format!("expected tx hash, got {result}")))?;

        B256::from_str(hash).map_err(|e| ExecutionError::MalformedResponse(e.to_string()))
    }

    /// Poll for the receipt until it appears. Errors while polling are
    /// logged and polled through; only the confirmation timeout ends the wait.
    async fn await_confirmation(&self, tx_hash: B256) -> ExecutionResult<UpdateReceipt> {
        let wait = async {
            loop {
                match self.fetch_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!("Receipt lookup for {} failed: {}", tx_hash, e),
                }
                tokio::time::sleep(self.config.receipt_poll_interval).await;
            }
        };

        tokio::time::timeout(self.config.confirmation_timeout, wait)
            .await
            .map_err(|_| ExecutionError::ConfirmationTimeout(tx_hash.to_string()))
    }
}
