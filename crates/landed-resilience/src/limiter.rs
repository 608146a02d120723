use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ResilienceError;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter (§4.2), shared across concurrent workers
/// targeting the same source identity. `rps=0` with `burst=0` never yields a
/// token, matching §8's boundary behavior ("all requests block until
/// cancelled").
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            capacity: burst as f64,
            refill_per_sec: rps,
            bucket: Mutex::new(Bucket { tokens: burst as f64, last_refill: Instant::now() }),
        }
    }

    /// Blocks cooperatively until a token is available or `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ResilienceError> {
        loop {
            {
                let mut bucket = self.bucket.lock().await;
                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                bucket.last_refill = Instant::now();
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }
            }
            let wait = if self.refill_per_sec > 0.0 {
                Duration::from_secs_f64((1.0 / self.refill_per_sec).min(1.0))
            } else {
                Duration::from_millis(250)
            };
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(ResilienceError::Cancelled),
            }
        }
    }
}
