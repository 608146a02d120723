use std::future::Future;
use std::time::Duration;

use landed_domain::ResilienceSpec;
use rand::Rng;
use tracing::warn;

use crate::error::ResilienceError;

/// An operation's own error type tells the retry loop whether it is worth
/// attempting again, and whether the remote end handed back an explicit
/// delay hint (HTTP `Retry-After`, SQL server busy hints, ...).
pub trait Transient {
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry-with-jittered-backoff (§4.2). Delay before attempt *k* (k ≥ 2):
/// `min(max_delay, base_delay * multiplier^(k-2)) * (1 + U(-jitter, +jitter))`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_fraction: f64,
}

impl From<&ResilienceSpec> for RetryPolicy {
    fn from(spec: &ResilienceSpec) -> Self {
        Self {
            max_attempts: spec.max_attempts,
            base_delay: Duration::from_millis(spec.base_delay_ms),
            max_delay: Duration::from_millis(spec.max_delay_ms),
            multiplier: spec.multiplier,
            jitter_fraction: spec.jitter_fraction,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let raw = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 2);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter_fraction > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_fraction..=self.jitter_fraction)
        } else {
            0.0
        };
        Duration::from_secs_f64((capped * (1.0 + jitter)).max(0.0))
    }

    /// Runs `op` up to `max_attempts` times. `op` is re-invoked fresh on each
    /// attempt (no shared mutable future state). Only errors whose
    /// [`Transient::is_retryable`] returns true are retried; anything else
    /// propagates on the first failure.
    pub async fn run<F, Fut, T, E>(&self, identity: &str, mut op: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::error::Error + Send + Sync + 'static,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts || !err.is_retryable() => {
                    return Err(ResilienceError::Exhausted {
                        identity: identity.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = err.retry_after().unwrap_or_else(|| self.delay_for_attempt(attempt + 1));
                    warn!(identity, attempt, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
