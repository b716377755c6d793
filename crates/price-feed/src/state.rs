//! Running aggregation state carried between poll cycles
//!
//! Owned by the poll loop and reset only at process start; nothing here is
//! persisted across restarts.

use chrono::{DateTime, Utc};

/// Outcome of one sampling cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateDelta {
    /// Accumulated Σ(weight × price) including this cycle
    pub weighted_sum: f64,
    /// Accumulated Σ(weight) including this cycle
    pub total_weight: f64,
    /// Smoothed price estimate in USD
    pub price_estimate: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    pub weighted_sum: f64,
    pub total_weight: f64,
    pub sample_count: u64,
    /// `None` until the first update has been sent
    pub last_published_at: Option<DateTime<Utc>>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// No usable history yet, so the next estimate is a plain weighted mean
    pub fn is_cold(&self) -> bool {
        self.total_weight == 0.0 || self.weighted_sum == 0.0
    }

    /// Running weighted mean of everything seen so far
    pub fn running_price(&self) -> Option<f64> {
        if self.is_cold() {
            None
        } else {
            Some(self.weighted_sum / self.total_weight)
        }
    }

    /// Fold a completed cycle into the state
    pub fn apply(&mut self, delta: &AggregateDelta) {
        self.weighted_sum = delta.weighted_sum;
        self.total_weight = delta.total_weight;
        self.sample_count += 1;
    }

    pub fn mark_published(&mut self, at: DateTime<Utc>) {
        self.last_published_at = Some(at);
    }
}
