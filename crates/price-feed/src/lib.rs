//! Exchange price feeds and the volume-weighted aggregator
//!
//! Features:
//! - HTTP ticker feeds for Gemini, GDAX, Bitfinex and Kraken
//! - Concurrent fan-out with per-source bounded retry
//! - Volume-weighted running mean with exponential smoothing

pub mod aggregator;
pub mod feeds;
pub mod state;

pub use aggregator::{combine, PriceAggregator};
pub use feeds::{default_sources, http_client, ExchangeSource, HttpTickerFeed};
pub use state::{AggregateDelta, AggregateState};
