mod breaker;
mod error;
mod limiter;
mod registry;
mod retry;

use std::future::Future;

use landed_domain::ResilienceSpec;
use tokio_util::sync::CancellationToken;

pub use breaker::CircuitBreaker;
pub use error::ResilienceError;
pub use limiter::RateLimiter;
pub use registry::ResilienceRegistry;
pub use retry::{RetryPolicy, Transient};

/// Composes rate limiter, breaker, and retry around one call (§4.2
/// "Composition"): the limiter acquires before the retry timer; the breaker
/// check is the outermost gate; retries share the same breaker and limiter.
pub struct Gate<'a> {
    identity: &'a str,
    breaker: std::sync::Arc<CircuitBreaker>,
    limiter: std::sync::Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl<'a> Gate<'a> {
    pub async fn new(identity: &'a str, spec: &ResilienceSpec, registry: &ResilienceRegistry) -> Self {
        Self {
            identity,
            breaker: registry.breaker_for(identity, spec).await,
            limiter: registry.limiter_for(identity, spec).await,
            retry: RetryPolicy::from(spec),
        }
    }

    pub async fn call<F, Fut, T, E>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::error::Error + Send + Sync + 'static,
    {
        self.breaker.check().await?;
        self.limiter.acquire(cancel).await?;

        let result = self
            .retry
            .run(self.identity, || op())
            .await;

        match &result {
            Ok(_) => self.breaker.record_success().await,
            Err(_) => self.breaker.record_failure().await,
        }
        result
    }
}
