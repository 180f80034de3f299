use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use cinelibre_engine::db::{create_pool, CatalogStore, PgCatalogStore};
use cinelibre_engine::models::ContentType;
use cinelibre_engine::services::embedding::Embedder;
use cinelibre_engine::services::providers::{GoogleBooksSource, TmdbSource};
use cinelibre_engine::services::{CancelToken, RateLimiter, SyncOrchestrator, SyncReport};
use cinelibre_engine::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool));
    let embedder = build_embedder(&config.embedding_model)?;
    let limiter = Arc::new(RateLimiter::new(
        config.source_rate_limit,
        Duration::from_secs(config.source_rate_window_secs),
    ));

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing current item");
            ctrl_c_cancel.cancel();
        }
    });

    let movies = SyncOrchestrator::new(
        Arc::new(TmdbSource::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            limiter.clone(),
        )),
        embedder.clone(),
        store.clone(),
    );
    let movie_report = movies
        .sync(ContentType::Movie, config.movie_target, &cancel)
        .await?;
    print_report(&movie_report);

    let books = SyncOrchestrator::new(
        Arc::new(GoogleBooksSource::new(
            config.google_books_api_url.clone(),
            limiter,
        )),
        embedder,
        store.clone(),
    );
    let book_report = books
        .sync(ContentType::Book, config.book_target, &cancel)
        .await?;
    print_report(&book_report);

    let movie_count = store.count_items(ContentType::Movie).await?;
    let book_count = store.count_items(ContentType::Book).await?;
    tracing::info!(movies = movie_count, books = book_count, "catalog totals");

    Ok(())
}

#[cfg(feature = "local-embeddings")]
fn build_embedder(model_name: &str) -> anyhow::Result<Arc<dyn Embedder>> {
    use cinelibre_engine::services::embedding::LocalEmbedder;
    Ok(Arc::new(LocalEmbedder::new(model_name)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn build_embedder(_model_name: &str) -> anyhow::Result<Arc<dyn Embedder>> {
    anyhow::bail!(
        "this binary was built without an embedding backend; \
         rebuild with --features local-embeddings"
    )
}

fn print_report(report: &SyncReport) {
    tracing::info!(
        content_type = %report.content_type,
        synced = report.synced,
        failed = report.failed,
        skipped = report.skipped,
        duplicates = report.duplicates,
        source_failures = report.source_failures,
        exhausted = report.exhausted,
        cancelled = report.cancelled,
        duration_secs = report.duration.as_secs(),
        "sync report"
    );
}
