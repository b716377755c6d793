//! Convergence and timing gate for on-chain updates

use chrono::{DateTime, Utc};
use std::time::Duration;

use oracle_core::{cents_to_usd, OracleSettings};

/// Decides when the running estimate is worth publishing
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePolicy {
    convergence_threshold: u64,
    update_interval: Duration,
    polling_delay: Duration,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::from_settings(&OracleSettings::default())
    }
}

impl UpdatePolicy {
    pub fn new(convergence_threshold: u64, update_interval: Duration, polling_delay: Duration) -> Self {
        Self {
            convergence_threshold,
            update_interval,
            polling_delay,
        }
    }

    pub fn from_settings(settings: &OracleSettings) -> Self {
        Self::new(
            settings.convergence_threshold,
            settings.update_interval,
            settings.polling_delay,
        )
    }

    pub fn polling_delay(&self) -> Duration {
        self.polling_delay
    }

    /// Strictly more cycles than the threshold have been blended
    pub fn has_converged(&self, sample_count: u64) -> bool {
        sample_count > self.convergence_threshold
    }

    /// Time since the last update, `None` if nothing was ever published
    pub fn elapsed_since(&self, last_published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
        last_published_at.map(|last| (now - last).to_std().unwrap_or(Duration::ZERO))
    }

    /// Strictly more than the update interval has passed since the last update
    pub fn is_time_to_update(&self, last_published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.elapsed_since(last_published_at, now) {
            Some(elapsed) => elapsed > self.update_interval,
            None => true,
        }
    }

    pub fn should_publish(
        &self,
        sample_count: u64,
        last_published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        self.has_converged(sample_count) && self.is_time_to_update(last_published_at, now)
    }

    /// Per-cycle progress line
    pub fn status_line(
        &self,
        price_cents: u64,
        sample_count: u64,
        last_published_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> String {
        let price = cents_to_usd(price_cents);

        if self.has_converged(sample_count) {
            let time_left = match self.elapsed_since(last_published_at, now) {
                Some(elapsed) => self.update_interval.saturating_sub(elapsed),
                None => Duration::ZERO,
            };
            format!(
                "Calculated price: {} next update in {} sec",
                price,
                time_left.as_millis() as f64 / 1000.0
            )
        } else {
            let remaining = self.convergence_threshold - sample_count;
            format!(
                "Calculated price: {} first update in {} sec",
                price,
                self.polling_delay.as_secs_f64() * remaining as f64
            )
        }
    }
}
