//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{PriceFeedError, PriceFeedResult};

/// Exchange venues polled for ETH/USD trade data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Gemini,
    Gdax,
    Bitfinex,
    Kraken,
}

impl Exchange {
    pub const ALL: [Exchange; 4] = [
        Exchange::Gemini,
        Exchange::Gdax,
        Exchange::Bitfinex,
        Exchange::Kraken,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Gemini => "gemini",
            Exchange::Gdax => "gdax",
            Exchange::Bitfinex => "bitfinex",
            Exchange::Kraken => "kraken",
        }
    }

    /// Public ticker endpoint for the ETH/USD pair
    pub fn ticker_url(&self) -> &'static str {
        match self {
            Exchange::Gemini => "https://api.gemini.com/v1/pubticker/ethusd",
            Exchange::Gdax => "https://api.gdax.com/products/ETH-USD/ticker",
            Exchange::Bitfinex => "https://api.bitfinex.com/v1/pubticker/ethusd",
            Exchange::Kraken => "https://api.kraken.com/0/public/Ticker?pair=ETHUSD",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One (volume, price) observation from a single venue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    pub weight: f64,
    pub price: f64,
}

impl SamplePair {
    /// Validated constructor. Weight must be a finite non-negative volume,
    /// price a finite positive quote.
    pub fn new(weight: f64, price: f64) -> PriceFeedResult<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(PriceFeedError::InvalidSample(format!(
                "weight must be non-negative, got {weight}"
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(PriceFeedError::InvalidSample(format!(
                "price must be positive, got {price}"
            )));
        }
        Ok(Self { weight, price })
    }

    pub fn product(&self) -> f64 {
        self.weight * self.price
    }
}

/// Convert a USD price to whole cents, rounding down
pub fn to_cents(price: f64) -> u64 {
    (price * 100.0).floor() as u64
}

/// Render a cents amount as a dollar string, e.g. `$123.45`
pub fn cents_to_usd(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}
