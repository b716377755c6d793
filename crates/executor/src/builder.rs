//! Transaction builder for price updates

use alloy_primitives::{hex, keccak256, Address, Bytes, U256};
use serde_json::{json, Value};

use oracle_core::{OracleConfig, GAS_LIMIT};

/// Contract entry point receiving the price in cents
pub const UPDATE_RATE_SIGNATURE: &str = "updateRate(uint256)";

/// First four bytes of the keccak hash of the method signature
pub fn method_selector() -> [u8; 4] {
    let hash = keccak256(UPDATE_RATE_SIGNATURE.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// 32-byte big-endian ABI word for a price in cents
pub fn pad_price(cents: u64) -> [u8; 32] {
    U256::from(cents).to_be_bytes::<32>()
}

/// Lowercase hex of [`pad_price`], 64 characters, no prefix
pub fn pad_price_hex(cents: u64) -> String {
    hex::encode(pad_price(cents))
}

/// Inverse of [`pad_price`]. `None` if the word does not fit in 64 bits.
pub fn decode_price(word: &[u8; 32]) -> Option<u64> {
    let value = U256::from_be_bytes(*word);
    if value > U256::from(u64::MAX) {
        return None;
    }
    Some(value.as_limbs()[0])
}

/// Format a wei amount as ETH without trailing zeros, e.g. `0.000000000004305`
pub fn format_ether(wei: U256) -> String {
    let digits = format!("{:0>19}", wei.to_string());
    let (whole, frac) = digits.split_at(digits.len() - 18);
    let frac = frac.trim_end_matches('0');

    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

/// Built transaction ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdateTx {
    pub to: Address,
    pub from: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub data: Bytes,
}

impl PriceUpdateTx {
    /// Upper bound on the fee, gas limit × gas price
    pub fn cost(&self) -> U256 {
        U256::from(self.gas_limit) * self.gas_price
    }

    /// JSON-RPC transaction object
    pub fn to_rpc_json(&self) -> Value {
        json!({
            "from": self.from.to_string(),
            "to": self.to.to_string(),
            "gas": format!("0x{:x}", self.gas_limit),
            "gasPrice": format!("0x{:x}", self.gas_price),
            "data": format!("0x{}", hex::encode(&self.data)),
        })
    }
}

/// Transaction builder
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    contract_address: Address,
    owner_address: Address,
    gas_limit: u64,
}

impl TransactionBuilder {
    pub fn new(contract_address: Address, owner_address: Address) -> Self {
        Self {
            contract_address,
            owner_address,
            gas_limit: GAS_LIMIT,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(config.contract_address, config.owner_address)
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// `selector ++ pad(price)`
    pub fn calldata(&self, cents: u64) -> Bytes {
        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&method_selector());
        data.extend_from_slice(&pad_price(cents));
        Bytes::from(data)
    }

    pub fn build(&self, cents: u64, gas_price: U256) -> PriceUpdateTx {
        PriceUpdateTx {
            to: self.contract_address,
            from: self.owner_address,
            gas_limit: self.gas_limit,
            gas_price,
            data: self.calldata(cents),
        }
    }
}
