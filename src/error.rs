/// Engine-level errors
///
/// The taxonomy mirrors how failures propagate through the pipeline:
/// per-item errors (`Embedding`, `Store`) are absorbed at the item boundary
/// and counted in the sync report, while `SourceAuth` and `StoreUnavailable`
/// are fatal to the whole run.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The content source's request budget is exhausted. Callers back off and
    /// retry the same request a bounded number of times.
    #[error("rate limited by content source")]
    RateLimited,

    /// Permanent per-request source failure. Logged, skipped, counted.
    #[error("content source error: {0}")]
    Source(String),

    /// Credentials rejected by the content source. Never retried.
    #[error("content source rejected credentials: {0}")]
    SourceAuth(String),

    /// Per-item embedding failure (e.g. unembeddable text).
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Per-item write failure (e.g. constraint violation).
    #[error("store write failed: {0}")]
    Store(String),

    /// The catalog store itself is unreachable. Fatal to the current run.
    #[error("catalog store unreachable: {0}")]
    StoreUnavailable(String),

    /// Malformed interaction or rating input. Rejected, never coerced.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // Connection-level failures mean the store itself is gone, which
            // aborts a sync run instead of being counted per item.
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => EngineError::StoreUnavailable(e.to_string()),
            other => EngineError::Store(other.to_string()),
        }
    }
}

impl EngineError {
    /// Whether this error aborts an entire sync run rather than one item.
    pub fn is_fatal_for_sync(&self) -> bool {
        matches!(
            self,
            EngineError::SourceAuth(_) | EngineError::StoreUnavailable(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_unavailable_is_fatal() {
        let err = EngineError::StoreUnavailable("connection refused".to_string());
        assert!(err.is_fatal_for_sync());
    }

    #[test]
    fn test_auth_error_is_fatal() {
        let err = EngineError::SourceAuth("401 Unauthorized".to_string());
        assert!(err.is_fatal_for_sync());
    }

    #[test]
    fn test_per_item_errors_are_not_fatal() {
        assert!(!EngineError::Embedding("empty text".to_string()).is_fatal_for_sync());
        assert!(!EngineError::Store("unique violation".to_string()).is_fatal_for_sync());
        assert!(!EngineError::Source("500".to_string()).is_fatal_for_sync());
        assert!(!EngineError::RateLimited.is_fatal_for_sync());
    }

    #[test]
    fn test_sqlx_pool_errors_map_to_unavailable() {
        let err: EngineError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
    }

    #[test]
    fn test_sqlx_row_errors_map_to_store() {
        let err: EngineError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, EngineError::Store(_)));
    }
}
