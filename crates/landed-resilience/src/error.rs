use thiserror::Error;

use landed_domain::ErrorKind;

#[derive(Debug, Error)]
pub enum ResilienceError {
    #[error("breaker-open for '{identity}'")]
    BreakerOpen { identity: String },

    #[error("cancelled while waiting for rate limiter token")]
    Cancelled,

    #[error("retries exhausted for '{identity}' after {attempts} attempt(s): {source}")]
    Exhausted {
        identity: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ResilienceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilienceError::BreakerOpen { .. } => ErrorKind::Network,
            ResilienceError::Cancelled => ErrorKind::Cancelled,
            ResilienceError::Exhausted { .. } => ErrorKind::Network,
        }
    }
}
