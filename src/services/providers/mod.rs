/// Content source abstraction
///
/// This module provides a pluggable architecture for the external catalogs
/// feeding the sync pipeline (TMDB for movies, Google Books for books). Each
/// provider serves paginated candidate pages for a query plan, going through
/// the shared rate limiter and the bounded retry policy.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{EngineError, EngineResult};
use crate::models::{CandidateRecord, ContentType};
use crate::services::discovery::QueryPlan;
use crate::services::rate_limit::RateLimiter;

pub mod google_books;
pub mod tmdb;

pub use google_books::GoogleBooksSource;
pub use tmdb::TmdbSource;

/// One page of raw candidates from a content source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    pub records: Vec<CandidateRecord>,
    /// Whether the source reports further pages past this one.
    pub has_more: bool,
}

/// Trait for external content catalogs.
///
/// Implementations are stateless apart from the injected rate limiter, so a
/// single instance can be shared by concurrent discovery tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch one page (1-based) of candidates for a query plan.
    ///
    /// Rate-limit rejections and transient upstream failures are retried a
    /// bounded number of times with backoff before escalating to a permanent
    /// source error. Auth rejections are surfaced immediately.
    async fn fetch(&self, plan: &QueryPlan, page: u32) -> EngineResult<SourcePage>;

    /// Content type this source serves.
    fn content_type(&self) -> ContentType;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Bounded retries after a failed attempt; 3 rejections in a row are retried,
/// a 4th failure escalates.
pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Outcome classification for a single request attempt.
#[derive(Debug)]
pub(crate) enum AttemptError {
    /// Source signalled the request budget is spent (429).
    RateLimited,
    /// Transient upstream failure (5xx, connection error).
    Transient(String),
    /// Not worth retrying (auth rejection, malformed request).
    Fatal(EngineError),
}

/// Maps an HTTP response to a usable response or a retry classification.
pub(crate) fn classify_response(
    source: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AttemptError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AttemptError::Fatal(EngineError::SourceAuth(format!(
            "{} returned {}",
            source, status
        ))));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AttemptError::RateLimited);
    }
    if status.is_server_error() {
        return Err(AttemptError::Transient(format!(
            "{} returned {}",
            source, status
        )));
    }

    Err(AttemptError::Fatal(EngineError::Source(format!(
        "{} returned {}",
        source, status
    ))))
}

/// Drives one logical request through the rate limiter and retry policy.
///
/// Every attempt consumes a limiter slot, so retries count against the same
/// budget as fresh requests. The caller pauses between attempts.
pub(crate) async fn with_retry<T, F, Fut>(
    limiter: &RateLimiter,
    source: &'static str,
    mut call: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut retries = 0u32;
    loop {
        limiter.acquire().await;
        match call().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(e)) => return Err(e),
            Err(transient) => {
                if retries >= MAX_RETRIES {
                    return Err(EngineError::Source(format!(
                        "{} still failing after {} retries: {:?}",
                        source, MAX_RETRIES, transient
                    )));
                }
                retries += 1;
                tracing::warn!(
                    source,
                    retry = retries,
                    error = ?transient,
                    "transient source failure, backing off"
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }
    }
}
