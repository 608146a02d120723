use std::time::Duration;

use landed_domain::ErrorKind;
use landed_resilience::{ResilienceError, Transient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {status} from {endpoint}: {body}")]
    Status { status: u16, endpoint: String, body: String, retry_after: Option<Duration> },

    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("columnar file read error: {0}")]
    Chunk(#[from] landed_chunk::ChunkError),

    #[error("resilience error: {0}")]
    Resilience(#[from] ResilienceError),

    #[error("config error: {0}")]
    Config(String),

    #[error("no custom source adapter registered for tag '{0}'")]
    UnknownCustomTag(String),

    #[error("record path '{0}' did not resolve to an array in the response body")]
    RecordPathNotFound(String),
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Http(_) => ErrorKind::Network,
            SourceError::Status { status, .. } => {
                if is_retryable_status(*status) {
                    ErrorKind::Network
                } else {
                    ErrorKind::Permanent
                }
            }
            SourceError::Sql(err) => sql_error_kind(err),
            SourceError::Io(_) => ErrorKind::Internal,
            SourceError::Csv(_) | SourceError::Json(_) | SourceError::RecordPathNotFound(_) | SourceError::Chunk(_) => {
                ErrorKind::DataQuality
            }
            SourceError::Glob(_) | SourceError::Config(_) | SourceError::UnknownCustomTag(_) => {
                ErrorKind::Config
            }
            SourceError::Resilience(err) => err.kind(),
        }
    }
}

impl Transient for SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            SourceError::Http(err) => err.is_timeout() || err.is_connect(),
            SourceError::Status { status, .. } => is_retryable_status(*status),
            SourceError::Sql(err) => matches!(sql_error_kind(err), ErrorKind::Network),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// §4.3: HTTP source retries on {408, 425, 429, 500, 502, 503, 504}.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Connection-class failures retry; query-syntax errors do not (§4.3 SQL source).
fn sql_error_kind(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => ErrorKind::Network,
        _ => ErrorKind::Permanent,
    }
}
