//! Poll loop driving sampling, smoothing and publishing
//!
//! The loop owns the aggregate state and mutates it only between await
//! points, so cycles never overlap. Publishing is detached: an update is
//! spawned onto its own task and its outcome comes back over a channel that
//! is drained at the start of every cycle. A slow confirmation can therefore
//! overlap a later publish; the contract must tolerate at-least-once updates.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use oracle_core::{cents_to_usd, to_cents, ConfigError, PriceFeedError};
use oracle_executor::{UpdatePublisher, UpdateReceipt};
use oracle_price_feed::{AggregateState, PriceAggregator};

use crate::policy::UpdatePolicy;

/// Errors that stop the daemon
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] PriceFeedError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run exactly one cycle and return
    Once,
    /// Poll until the shutdown future resolves
    Forever,
}

/// What a single cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Sampled { price_cents: u64, published: bool },
    /// No venue answered; state left untouched
    Skipped,
}

/// Result of a detached publish task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub price_cents: u64,
    pub receipt: Option<UpdateReceipt>,
}

pub struct PriceOracle {
    aggregator: PriceAggregator,
    publisher: Arc<UpdatePublisher>,
    policy: UpdatePolicy,
    state: AggregateState,
    outcomes_tx: mpsc::UnboundedSender<PublishOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<PublishOutcome>,
    in_flight: usize,
}

impl PriceOracle {
    pub fn new(aggregator: PriceAggregator, publisher: UpdatePublisher, policy: UpdatePolicy) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Self {
            aggregator,
            publisher: Arc::new(publisher),
            policy,
            state: AggregateState::new(),
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Publish tasks spawned but not yet reported back
    pub fn pending_publishes(&self) -> usize {
        self.in_flight
    }

    /// Sample, update the estimate and publish if the policy allows it.
    ///
    /// A cycle with no data is fatal only while no baseline exists yet.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, OracleError> {
        let delta = match self.aggregator.sample(&self.state).await {
            Ok(delta) => delta,
            Err(e) if self.state.sample_count == 0 => return Err(e.into()),
            Err(e) => {
                error!("Skipping cycle: {}", e);
                return Ok(CycleOutcome::Skipped);
            }
        };

        self.state.apply(&delta);
        let price_cents = to_cents(delta.price_estimate);
        let now = Utc::now();
        let last_published_at = self.state.last_published_at;

        info!(
            "{}",
            self.policy
                .status_line(price_cents, self.state.sample_count, last_published_at, now)
        );

        let published = self
            .policy
            .should_publish(self.state.sample_count, last_published_at, now);
        if published {
            self.spawn_publish(price_cents);
            // stamped on dispatch, not on confirmation
            self.state.mark_published(now);
        }

        Ok(CycleOutcome::Sampled {
            price_cents,
            published,
        })
    }

    fn spawn_publish(&mut self, price_cents: u64) {
        let publisher = Arc::clone(&self.publisher);
        let outcomes = self.outcomes_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let receipt = publisher.publish(price_cents).await;
            let _ = outcomes.send(PublishOutcome {
                price_cents,
                receipt,
            });
        });
    }

    /// Log outcomes of publish tasks that finished since the last cycle
    pub fn drain_outcomes(&mut self) -> Vec<PublishOutcome> {
        let mut finished = Vec::new();

        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            match &outcome.receipt {
                Some(receipt) => info!(
                    "Published {} in tx {}",
                    cents_to_usd(outcome.price_cents),
                    receipt.transaction_hash
                ),
                None => warn!(
                    "Update to {} was not confirmed",
                    cents_to_usd(outcome.price_cents)
                ),
            }
            finished.push(outcome);
        }

        finished
    }

    /// Wait for the next publish task to finish
    pub async fn next_outcome(&mut self) -> Option<PublishOutcome> {
        let outcome = self.outcomes_rx.recv().await;
        if outcome.is_some() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        outcome
    }

    pub async fn run<S>(&mut self, mode: RunMode, shutdown: S) -> Result<(), OracleError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            self.drain_outcomes();
            self.run_cycle().await?;

            if mode == RunMode::Once {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
                _ = tokio::time::sleep(self.policy.polling_delay()) => {}
            }
        }

        self.drain_outcomes();
        if mode == RunMode::Forever && self.in_flight > 0 {
            warn!(
                "Stopping with {} price update(s) still awaiting confirmation",
                self.in_flight
            );
        }

        Ok(())
    }
}
