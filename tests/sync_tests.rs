//! End-to-end sync pipeline tests against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use cinelibre_engine::db::{CatalogStore, InMemoryCatalogStore};
use cinelibre_engine::error::{EngineError, EngineResult};
use cinelibre_engine::models::{
    CandidateRecord, CatalogItem, ContentType, MovieCandidate, NewCatalogItem, NewInteraction,
    NewRating, Rating, ScoredItem,
};
use cinelibre_engine::services::discovery::QueryPlan;
use cinelibre_engine::services::embedding::Embedder;
use cinelibre_engine::services::providers::{ContentSource, SourcePage};
use cinelibre_engine::services::{CancelToken, SyncOrchestrator};

/// Serves the same fixed candidate list for every query plan and counts
/// fetch calls.
struct ScriptedSource {
    records: Vec<CandidateRecord>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(records: Vec<CandidateRecord>) -> Self {
        Self {
            records,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    async fn fetch(&self, _plan: &QueryPlan, _page: u32) -> EngineResult<SourcePage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(SourcePage {
            records: self.records.clone(),
            has_more: false,
        })
    }

    fn content_type(&self) -> ContentType {
        ContentType::Movie
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Deterministic embedder: a tiny vector derived from the text bytes.
struct TestEmbedder;

#[async_trait]
impl Embedder for TestEmbedder {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        Ok(vec![1.0, (sum % 97) as f32 / 97.0, text.len() as f32])
    }

    fn dims(&self) -> usize {
        3
    }
}

/// Delegates to an inner store while counting upsert calls.
struct CountingStore {
    inner: InMemoryCatalogStore,
    upserts: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryCatalogStore::new(),
            upserts: AtomicUsize::new(0),
        }
    }

    fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for CountingStore {
    async fn upsert_item(&self, item: &NewCatalogItem) -> EngineResult<CatalogItem> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_item(item).await
    }

    async fn count_items(&self, content_type: ContentType) -> EngineResult<u64> {
        self.inner.count_items(content_type).await
    }

    async fn items_by_ids(&self, ids: &[Uuid]) -> EngineResult<Vec<CatalogItem>> {
        self.inner.items_by_ids(ids).await
    }

    async fn similarity_search(
        &self,
        content_type: ContentType,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngineResult<Vec<ScoredItem>> {
        self.inner
            .similarity_search(content_type, embedding, threshold, limit)
            .await
    }

    async fn insert_interaction(&self, interaction: &NewInteraction) -> EngineResult<()> {
        self.inner.insert_interaction(interaction).await
    }

    async fn upsert_rating(&self, rating: &NewRating) -> EngineResult<()> {
        self.inner.upsert_rating(rating).await
    }

    async fn all_ratings(&self) -> EngineResult<Vec<Rating>> {
        self.inner.all_ratings().await
    }
}

fn movie(id: i64, overview: &str) -> CandidateRecord {
    CandidateRecord::Movie(MovieCandidate {
        tmdb_id: id,
        title: format!("Movie {}", id),
        overview: overview.to_string(),
        release_date: None,
        language: Some("hi".to_string()),
        origin_country: vec!["IN".to_string()],
        poster_url: None,
    })
}

#[tokio::test]
async fn test_sync_is_idempotent_across_runs() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let records = vec![movie(1, "one"), movie(2, "two"), movie(3, "three")];

    for _ in 0..2 {
        let orchestrator = SyncOrchestrator::new(
            Arc::new(ScriptedSource::new(records.clone())),
            Arc::new(TestEmbedder),
            store.clone(),
        );
        let report = orchestrator
            .sync(ContentType::Movie, 3, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.synced, 3);
    }

    assert_eq!(store.count_items(ContentType::Movie).await.unwrap(), 3);
}

#[tokio::test]
async fn test_intra_run_duplicate_upserted_once() {
    let store = Arc::new(CountingStore::new());
    // Same tmdb id appearing under two query-plan combinations.
    let records = vec![movie(7, "first copy"), movie(7, "second copy")];

    let orchestrator = SyncOrchestrator::new(
        Arc::new(ScriptedSource::new(records)),
        Arc::new(TestEmbedder),
        store.clone(),
    );
    let report = orchestrator
        .sync(ContentType::Movie, 10, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(store.upsert_count(), 1);
    assert!(report.duplicates >= 1);
    assert_eq!(store.count_items(ContentType::Movie).await.unwrap(), 1);
}

#[tokio::test]
async fn test_zero_target_fetches_nothing() {
    let source = Arc::new(ScriptedSource::new(vec![movie(1, "one")]));
    let store = Arc::new(InMemoryCatalogStore::new());

    let orchestrator =
        SyncOrchestrator::new(source.clone(), Arc::new(TestEmbedder), store.clone());
    let report = orchestrator
        .sync(ContentType::Movie, 0, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.synced, 0);
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(store.count_items(ContentType::Movie).await.unwrap(), 0);
}

#[tokio::test]
async fn test_exhaustion_reports_partial_progress() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let records = vec![movie(1, "one"), movie(2, "two")];

    let orchestrator = SyncOrchestrator::new(
        Arc::new(ScriptedSource::new(records)),
        Arc::new(TestEmbedder),
        store.clone(),
    );
    let report = orchestrator
        .sync(ContentType::Movie, 500, &CancelToken::new())
        .await
        .unwrap();

    assert!(report.exhausted);
    assert_eq!(report.synced, 2);
    assert_eq!(store.count_items(ContentType::Movie).await.unwrap(), 2);
}

#[tokio::test]
async fn test_candidates_without_overview_are_skipped() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let records = vec![movie(1, ""), movie(2, "has overview")];

    let orchestrator = SyncOrchestrator::new(
        Arc::new(ScriptedSource::new(records)),
        Arc::new(TestEmbedder),
        store.clone(),
    );
    let report = orchestrator
        .sync(ContentType::Movie, 10, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_pre_cancelled_token_syncs_nothing() {
    let source = Arc::new(ScriptedSource::new(vec![movie(1, "one")]));
    let store = Arc::new(InMemoryCatalogStore::new());
    let cancel = CancelToken::new();
    cancel.cancel();

    let orchestrator =
        SyncOrchestrator::new(source.clone(), Arc::new(TestEmbedder), store.clone());
    let report = orchestrator
        .sync(ContentType::Movie, 10, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.synced, 0);
    assert_eq!(source.fetch_count(), 0);
}

/// A source whose first response is an auth rejection.
struct AuthFailingSource;

#[async_trait]
impl ContentSource for AuthFailingSource {
    async fn fetch(&self, _plan: &QueryPlan, _page: u32) -> EngineResult<SourcePage> {
        Err(EngineError::SourceAuth("invalid api key".to_string()))
    }

    fn content_type(&self) -> ContentType {
        ContentType::Movie
    }

    fn name(&self) -> &'static str {
        "auth-failing"
    }
}

#[tokio::test]
async fn test_auth_failure_aborts_sync() {
    let store = Arc::new(InMemoryCatalogStore::new());
    let orchestrator = SyncOrchestrator::new(
        Arc::new(AuthFailingSource),
        Arc::new(TestEmbedder),
        store.clone(),
    );

    let err = orchestrator
        .sync(ContentType::Movie, 10, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceAuth(_)));
    assert_eq!(store.count_items(ContentType::Movie).await.unwrap(), 0);
}
