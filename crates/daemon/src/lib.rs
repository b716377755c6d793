//! Poll loop and update policy for the ETH/USD oracle
//!
//! Ties the price feeds to the on-chain publisher

pub mod context;
pub mod oracle;
pub mod policy;

pub use context::OracleContext;
pub use oracle::{CycleOutcome, OracleError, PriceOracle, PublishOutcome, RunMode};
pub use policy::UpdatePolicy;
