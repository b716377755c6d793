//! Price aggregator - fans out to every venue and blends the results

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use oracle_core::{retry, PriceFeedError, PriceFeedResult, SamplePair, SMOOTHING_FACTOR};
use crate::feeds::ExchangeSource;
use crate::state::{AggregateDelta, AggregateState};

/// Σ(weight × price) over a set of samples
pub fn dot_product(samples: &[SamplePair]) -> f64 {
    samples.iter().map(SamplePair::product).sum()
}

/// Σ(weight) over a set of samples
pub fn total_weight(samples: &[SamplePair]) -> f64 {
    samples.iter().map(|s| s.weight).sum()
}

/// Blend one cycle's samples into the prior state.
///
/// While the prior state is cold the estimate is the plain running weighted
/// mean. Afterwards it is `α · running_mean + (1 − α) · prior_mean`. The
/// accumulators always grow by simple addition.
pub fn combine(
    prior: &AggregateState,
    samples: &[SamplePair],
    smoothing_factor: f64,
) -> PriceFeedResult<AggregateDelta> {
    let weighted_sum = prior.weighted_sum + dot_product(samples);
    let total_weight = prior.total_weight + total_weight(samples);

    if total_weight <= 0.0 {
        return Err(PriceFeedError::NoDataAvailable);
    }

    let running_mean = weighted_sum / total_weight;
    let price_estimate = match prior.running_price() {
        Some(prior_mean) => {
            smoothing_factor * running_mean + (1.0 - smoothing_factor) * prior_mean
        }
        None => running_mean,
    };

    Ok(AggregateDelta {
        weighted_sum,
        total_weight,
        price_estimate,
    })
}

/// Main price aggregator
pub struct PriceAggregator {
    sources: Vec<Arc<dyn ExchangeSource>>,
    smoothing_factor: f64,
}

impl PriceAggregator {
    pub fn new(sources: Vec<Arc<dyn ExchangeSource>>) -> Self {
        Self {
            sources,
            smoothing_factor: SMOOTHING_FACTOR,
        }
    }

    pub fn with_smoothing_factor(mut self, smoothing_factor: f64) -> Self {
        self.smoothing_factor = smoothing_factor;
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Query every source concurrently, each behind the bounded retry.
    /// Fails only when no source produced a sample.
    pub async fn collect(&self) -> PriceFeedResult<Vec<SamplePair>> {
        let fetches = self.sources.iter().map(|source| async move {
            let label = format!("{} fetch", source.name());
            let sample = retry(&label, || source.fetch()).await;
            (source.name(), sample)
        });

        let (succeeded, failed): (Vec<_>, Vec<_>) = join_all(fetches)
            .await
            .into_iter()
            .partition(|(_, sample)| sample.is_some());

        for (name, _) in &failed {
            warn!("Dropping {} from this cycle", name);
        }

        let samples: Vec<SamplePair> = succeeded
            .into_iter()
            .filter_map(|(_, sample)| sample)
            .collect();

        if samples.is_empty() {
            return Err(PriceFeedError::NoDataAvailable);
        }

        debug!("Raw data: {}", format_raw(&samples));
        Ok(samples)
    }

    /// Run one sampling cycle against the prior state
    pub async fn sample(&self, prior: &AggregateState) -> PriceFeedResult<AggregateDelta> {
        let samples = self.collect().await?;
        combine(prior, &samples, self.smoothing_factor)
    }
}

fn format_raw(samples: &[SamplePair]) -> String {
    let pairs: Vec<[f64; 2]> = samples.iter().map(|s| [s.weight, s.price]).collect();
    serde_json::to_string(&pairs).unwrap_or_default()
}
