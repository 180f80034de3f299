/// TMDB content source
///
/// Drives the discover endpoint across the movie query-plan space: each plan
/// pins a sort strategy, an original language, and a release-year window.
/// Crawling is scoped to the Indian regional catalog, matching the partition
/// dimensions in [`crate::services::discovery`].
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::error::{EngineError, EngineResult};
use crate::models::{CandidateRecord, ContentType, MovieCandidate, TmdbDiscoverResponse};
use crate::services::discovery::QueryPlan;
use crate::services::providers::{classify_response, with_retry, AttemptError, ContentSource, SourcePage};
use crate::services::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct TmdbSource {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    limiter: Arc<RateLimiter>,
}

impl TmdbSource {
    pub fn new(api_key: String, api_url: String, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            limiter,
        }
    }
}

#[async_trait]
impl ContentSource for TmdbSource {
    async fn fetch(&self, plan: &QueryPlan, page: u32) -> EngineResult<SourcePage> {
        let QueryPlan::Movies {
            strategy,
            language,
            window,
        } = plan
        else {
            return Err(EngineError::Validation(
                "TMDB source only serves movie query plans".to_string(),
            ));
        };

        let url = format!("{}/discover/movie", self.api_url);
        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("region", "IN".to_string()),
            ("with_origin_country", "IN".to_string()),
            ("with_original_language", language.clone()),
            ("sort_by", strategy.sort_param().to_string()),
            ("include_adult", "false".to_string()),
            ("page", page.to_string()),
            ("primary_release_date.gte", format!("{}-01-01", window.from)),
        ];
        if let Some(to) = window.to {
            query.push(("primary_release_date.lte", format!("{}-12-31", to)));
        }

        let response = with_retry(&self.limiter, "tmdb", || {
            let request = self.http_client.get(&url).query(&query);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| AttemptError::Transient(e.to_string()))?;
                classify_response("tmdb", response)
            }
        })
        .await?;

        let body: TmdbDiscoverResponse = response.json().await?;
        let has_more = body.page < body.total_pages;

        let records: Vec<CandidateRecord> = body
            .results
            .into_iter()
            .map(|raw| CandidateRecord::Movie(MovieCandidate::from(raw)))
            .collect();

        tracing::debug!(
            language = %language,
            sort = strategy.sort_param(),
            page,
            results = records.len(),
            has_more,
            "TMDB discover page fetched"
        );

        Ok(SourcePage { records, has_more })
    }

    fn content_type(&self) -> ContentType {
        ContentType::Movie
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
