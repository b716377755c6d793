//! Bounded retry for fallible async calls
//!
//! Every call site (exchange fetches and price update submission) shares
//! the same fixed ceiling. Exhausting it yields `None` instead of the error,
//! so a flaky collaborator never takes the poll loop down.

use std::fmt::Display;
use std::future::Future;
use tracing::{info, warn};

/// Attempts made before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Run `op` up to [`MAX_ATTEMPTS`] times. Returns the first success, or
/// `None` once every attempt has failed.
pub async fn retry<T, E, F, Fut>(label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", label, attempt, MAX_ATTEMPTS, e);
                if attempt < MAX_ATTEMPTS {
                    info!("retrying...");
                }
            }
        }
    }

    warn!("{} gave up after {} attempts", label, MAX_ATTEMPTS);
    None
}
