//! On-chain price update publishing
//!
//! Features:
//! - `updateRate(uint256)` calldata construction
//! - Gas price estimation from the node's price histogram
//! - Submission, confirmation and revert detection
//! - Bounded retry around the whole update

pub mod builder;
pub mod chain;
pub mod submitter;

pub use builder::{PriceUpdateTx, TransactionBuilder};
pub use chain::{ChainClient, ChainClientConfig, JsonRpcClient, UpdateReceipt};
pub use submitter::UpdatePublisher;
