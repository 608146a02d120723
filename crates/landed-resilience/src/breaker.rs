use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ResilienceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Per-(backend, source) circuit breaker (§4.2). `closed` counts consecutive
/// failures; `threshold` trips to `open`. `open` fails fast for `cooldown`
/// then allows one probe in `half-open`.
pub struct CircuitBreaker {
    identity: String,
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(identity: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            identity: identity.into(),
            threshold,
            cooldown,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Call before attempting the guarded operation. Transitions `open` to
    /// `half-open` once cooldown elapses.
    pub async fn check(&self) -> Result<(), ResilienceError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Closed => Ok(()),
            State::HalfOpen => Ok(()),
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    inner.state = State::HalfOpen;
                    debug!(identity = %self.identity, "breaker entering half-open");
                    Ok(())
                } else {
                    Err(ResilienceError::BreakerOpen { identity: self.identity.clone() })
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != State::Closed {
            info!(identity = %self.identity, "breaker closing after successful probe");
        }
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
                info!(identity = %self.identity, "breaker re-opening after failed probe");
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                    info!(identity = %self.identity, threshold = self.threshold, "breaker opening");
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_secs(30));
        for _ in 0..2 {
            breaker.check().await.unwrap();
            breaker.record_failure().await;
        }
        breaker.check().await.unwrap();
        breaker.record_failure().await;
        assert!(breaker.check().await.is_err());
    }

    #[tokio::test]
    async fn half_open_probe_success_closes_breaker() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(5));
        breaker.check().await.unwrap();
        breaker.record_failure().await;
        assert!(breaker.check().await.is_err());
        tokio::time::sleep(Duration::from_millis(10)).await;
        breaker.check().await.unwrap();
        breaker.record_success().await;
        breaker.check().await.unwrap();
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(5));
        breaker.check().await.unwrap();
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        breaker.check().await.unwrap();
        breaker.record_failure().await;
        assert!(breaker.check().await.is_err());
    }
}
