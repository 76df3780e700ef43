use crate::error::{Result, ScoutError};
use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::warn;

/// Bounded retry with a fixed delay of twice the backoff unit between attempts.
///
/// Attempts are counted from `start_attempt`; the call gives up once the
/// counter reaches `max_attempts`, so a policy starting at 1 makes exactly
/// `max_attempts` calls. The first call always happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub start_attempt: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, start_attempt: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            start_attempt,
            backoff,
        }
    }

    pub fn delay(&self) -> Duration {
        self.backoff * 2
    }

    /// Retries left after the first call.
    pub fn retries(&self) -> usize {
        self.max_attempts.saturating_sub(self.start_attempt) as usize
    }

    pub fn with_backoff(self, backoff: Duration) -> Self {
        RetryPolicy { backoff, ..self }
    }
}

/// Per-call-site policies. Each remote call kind has its own tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicies {
    pub block: RetryPolicy,
    pub transaction: RetryPolicy,
    pub receipt: RetryPolicy,
    pub token_name: RetryPolicy,
    pub token_symbol: RetryPolicy,
    pub token_decimals: RetryPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        RetryPolicies {
            block: RetryPolicy::new(6, 1, Duration::from_secs(10)),
            transaction: RetryPolicy::new(6, 1, Duration::from_secs(6)),
            receipt: RetryPolicy::new(6, 1, Duration::from_secs(6)),
            token_name: RetryPolicy::new(5, 1, Duration::from_secs(10)),
            token_symbol: RetryPolicy::new(6, 1, Duration::from_secs(10)),
            token_decimals: RetryPolicy::new(6, 1, Duration::from_secs(6)),
        }
    }
}

impl RetryPolicies {
    pub fn uniform(policy: RetryPolicy) -> Self {
        RetryPolicies {
            block: policy,
            transaction: policy,
            receipt: policy,
            token_name: policy,
            token_symbol: policy,
            token_decimals: policy,
        }
    }

    pub fn with_backoff(self, backoff: Duration) -> Self {
        RetryPolicies {
            block: self.block.with_backoff(backoff),
            transaction: self.transaction.with_backoff(backoff),
            receipt: self.receipt.with_backoff(backoff),
            token_name: self.token_name.with_backoff(backoff),
            token_symbol: self.token_symbol.with_backoff(backoff),
            token_decimals: self.token_decimals.with_backoff(backoff),
        }
    }
}

pub async fn retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut action: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let strategy = FixedInterval::new(policy.delay()).take(policy.retries());
    let mut attempt = policy.start_attempt;
    let mut made = 0u32;

    let result = Retry::spawn(strategy, || {
        let current = attempt;
        attempt += 1;
        made += 1;
        let call = action();
        async move {
            call.await.inspect_err(|e| {
                warn!(
                    "{} failed on attempt {} of {}: {}",
                    operation, current, policy.max_attempts, e
                );
            })
        }
    })
    .await;

    result.map_err(|e| ScoutError::RetryExhausted {
        operation: operation.to_string(),
        attempts: made,
        source: Box::new(e),
    })
}
