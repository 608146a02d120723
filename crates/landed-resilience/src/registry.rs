use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use landed_domain::ResilienceSpec;
use tokio::sync::RwLock;

use crate::breaker::CircuitBreaker;
use crate::limiter::RateLimiter;

/// Process-wide registries of breakers and limiters keyed by source identity
/// (§5 "Shared mutable resources"). Lazily creates an entry the first time an
/// identity is seen, then hands out the same `Arc` to every caller — this is
/// what lets retries across concurrent workers share one breaker/limiter per
/// identity rather than each worker tracking its own.
pub struct ResilienceRegistry {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    limiters: RwLock<HashMap<String, Arc<RateLimiter>>>,
}

impl ResilienceRegistry {
    pub fn new() -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            limiters: RwLock::new(HashMap::new()),
        }
    }

    pub async fn breaker_for(&self, identity: &str, spec: &ResilienceSpec) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().await.get(identity) {
            return existing.clone();
        }
        let mut guard = self.breakers.write().await;
        guard
            .entry(identity.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    identity,
                    spec.breaker_threshold,
                    Duration::from_secs(spec.breaker_cooldown_s),
                ))
            })
            .clone()
    }

    pub async fn limiter_for(&self, identity: &str, spec: &ResilienceSpec) -> Arc<RateLimiter> {
        if let Some(existing) = self.limiters.read().await.get(identity) {
            return existing.clone();
        }
        let mut guard = self.limiters.write().await;
        guard
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::new(spec.rate_limit_rps, spec.rate_limit_burst)))
            .clone()
    }
}

impl Default for ResilienceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_identity_shares_one_breaker() {
        let registry = ResilienceRegistry::new();
        let spec = ResilienceSpec::default();
        let a = registry.breaker_for("crm.accounts", &spec).await;
        let b = registry.breaker_for("crm.accounts", &spec).await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn distinct_identities_get_distinct_limiters() {
        let registry = ResilienceRegistry::new();
        let spec = ResilienceSpec::default();
        let a = registry.limiter_for("crm.accounts", &spec).await;
        let b = registry.limiter_for("crm.orders", &spec).await;
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
