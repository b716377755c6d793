//! Core types and utilities for the ETH/USD price oracle
//!
//! This crate provides shared pieces used across all components:
//! - Exchange venues and sample types
//! - Cents conversions
//! - Configuration and algorithm constants
//! - Error taxonomy
//! - Bounded retry

pub mod types;
pub mod config;
pub mod errors;
pub mod retry;

pub use types::*;
pub use config::*;
pub use errors::*;
pub use retry::{retry, MAX_ATTEMPTS};
