//! Bounded retry for optimistic-concurrency conflicts.
//!
//! Every write runs in its own transaction and checks row versions on the way
//! out. When a check fails the whole transaction is rolled back and re-run
//! against fresh state, up to a configured number of attempts.

use std::future::Future;
use std::time::Duration;

use lexledger_core::BillingError;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff before the first retry; doubled on every further attempt.
const INITIAL_BACKOFF_MS: u64 = 5;
/// Upper bound on the backoff between attempts.
const MAX_BACKOFF_MS: u64 = 200;

fn backoff(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` attempts have conflicted.
///
/// Exhausted retries surface as `ConcurrencyConflict { attempts }`.
///
/// ```ignore
/// let receipt = with_retry("consume_advance", 3, || async {
///     self.consume_once(tenant_id, advance_id, amount).await
/// })
/// .await?;
/// ```
pub async fn with_retry<T, F, Fut>(
    operation: &str,
    max_attempts: u32,
    mut op: F,
) -> Result<T, BillingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BillingError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "commit succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() => {
                if attempt >= max_attempts {
                    warn!(operation, attempts = attempt, "giving up after repeated conflicts");
                    return Err(BillingError::ConcurrencyConflict { attempts: attempt });
                }
                let delay = backoff(attempt);
                debug!(
                    operation,
                    attempt,
                    backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "version check failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
