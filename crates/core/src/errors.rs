//! Error types

use thiserror::Error;

/// Configuration errors, fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is missing in environment")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Price feed errors
#[derive(Debug, Error)]
pub enum PriceFeedError {
    #[error("unable to fetch any price data from exchanges!")]
    NoDataAvailable,

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Malformed response from {venue}: {reason}")]
    MalformedResponse { venue: &'static str, reason: String },
}

/// Execution errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("Gas price history is empty")]
    EmptyGasHistory,

    #[error("Update failed")]
    UpdateFailed,

    #[error("Transaction {0} not mined in time")]
    ConfirmationTimeout(String),
}

/// Result type alias
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PriceFeedResult<T> = Result<T, PriceFeedError>;
pub type ExecutionResult<T> = Result<T, ExecutionError>;
