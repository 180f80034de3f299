/// Google Books content source
///
/// Pages through the volumes endpoint per (ordering, category) query plan.
/// The API caps a page at 40 volumes; a full page is taken to mean more may
/// follow.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use crate::error::{EngineError, EngineResult};
use crate::models::{BookCandidate, CandidateRecord, ContentType, GoogleVolumesResponse};
use crate::services::discovery::QueryPlan;
use crate::services::providers::{classify_response, with_retry, AttemptError, ContentSource, SourcePage};
use crate::services::rate_limit::RateLimiter;

const PAGE_SIZE: u32 = 40;

#[derive(Clone)]
pub struct GoogleBooksSource {
    http_client: HttpClient,
    api_url: String,
    limiter: Arc<RateLimiter>,
}

impl GoogleBooksSource {
    pub fn new(api_url: String, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            limiter,
        }
    }
}

#[async_trait]
impl ContentSource for GoogleBooksSource {
    async fn fetch(&self, plan: &QueryPlan, page: u32) -> EngineResult<SourcePage> {
        let QueryPlan::Books { strategy, category } = plan else {
            return Err(EngineError::Validation(
                "Google Books source only serves book query plans".to_string(),
            ));
        };

        let start_index = page.saturating_sub(1) * PAGE_SIZE;
        let query: Vec<(&str, String)> = vec![
            ("q", category.clone()),
            ("orderBy", strategy.order_param().to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("startIndex", start_index.to_string()),
        ];

        let response = with_retry(&self.limiter, "google_books", || {
            let request = self.http_client.get(&self.api_url).query(&query);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| AttemptError::Transient(e.to_string()))?;
                classify_response("google_books", response)
            }
        })
        .await?;

        let body: GoogleVolumesResponse = response.json().await?;
        let has_more = body.items.len() as u32 == PAGE_SIZE;

        let records: Vec<CandidateRecord> = body
            .items
            .into_iter()
            .map(|raw| CandidateRecord::Book(BookCandidate::from(raw)))
            .collect();

        tracing::debug!(
            category = %category,
            order = strategy.order_param(),
            page,
            results = records.len(),
            has_more,
            "Google Books volumes page fetched"
        );

        Ok(SourcePage { records, has_more })
    }

    fn content_type(&self) -> ContentType {
        ContentType::Book
    }

    fn name(&self) -> &'static str {
        "google_books"
    }
}
