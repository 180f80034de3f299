use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::CatalogStore;
use crate::error::EngineResult;
use crate::models::{CatalogEntry, ContentType};
use crate::services::dedup::{Admission, Deduplicator};
use crate::services::discovery::CandidateStream;
use crate::services::embedding::Embedder;
use crate::services::ingest::Ingestor;
use crate::services::providers::ContentSource;

const PROGRESS_LOG_EVERY: usize = 50;

/// Cooperative cancellation flag, checked between items so an interrupted
/// sync keeps everything already upserted.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub content_type: ContentType,
    /// Items successfully embedded and upserted.
    pub synced: usize,
    /// Per-item embedding or store failures.
    pub failed: usize,
    /// Candidates skipped for missing title or overview/description.
    pub skipped: usize,
    /// Intra-run duplicate candidates discarded before persistence.
    pub duplicates: usize,
    /// Query-plan combinations skipped on permanent source errors.
    pub source_failures: usize,
    /// The plan space ran out before the target was reached.
    pub exhausted: bool,
    pub cancelled: bool,
    pub duration: Duration,
}

impl SyncReport {
    fn empty(content_type: ContentType) -> Self {
        Self {
            content_type,
            synced: 0,
            failed: 0,
            skipped: 0,
            duplicates: 0,
            source_failures: 0,
            exhausted: false,
            cancelled: false,
            duration: Duration::ZERO,
        }
    }
}

/// Drives discovery, dedup and persistence for one content type.
///
/// Candidates are processed as they are discovered, so partial progress
/// survives an interruption, and re-running after a partial run converges on
/// the target without creating duplicates.
pub struct SyncOrchestrator {
    source: Arc<dyn ContentSource>,
    ingestor: Ingestor,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn ContentSource>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            source,
            ingestor: Ingestor::new(embedder, store),
        }
    }

    /// Syncs toward `target_count` deduplicated items. Source exhaustion
    /// short of the target completes with a partial count; only auth and
    /// store-unreachable failures abort the run.
    pub async fn sync(
        &self,
        content_type: ContentType,
        target_count: usize,
        cancel: &CancelToken,
    ) -> EngineResult<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::empty(content_type);

        if target_count == 0 {
            return Ok(report);
        }

        tracing::info!(
            content_type = %content_type,
            target = target_count,
            source = self.source.name(),
            "sync started"
        );

        let mut stream = CandidateStream::new(self.source.clone(), content_type);
        let mut dedup = Deduplicator::new();

        while report.synced < target_count {
            if cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!(synced = report.synced, "sync cancelled");
                break;
            }

            let record = match stream.next().await? {
                Some(record) => record,
                None => {
                    report.exhausted = true;
                    tracing::info!(
                        synced = report.synced,
                        target = target_count,
                        "query plans exhausted before target"
                    );
                    break;
                }
            };

            if dedup.admit(&record) == Admission::Duplicate {
                report.duplicates += 1;
                continue;
            }
            if !record.has_embeddable_text() {
                report.skipped += 1;
                continue;
            }

            match self.ingestor.persist(&record).await {
                Ok(_) => {
                    report.synced += 1;
                    if report.synced % PROGRESS_LOG_EVERY == 0 {
                        tracing::info!(
                            content_type = %content_type,
                            synced = report.synced,
                            target = target_count,
                            "sync progress"
                        );
                    }
                }
                Err(e) if e.is_fatal_for_sync() => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        source_id = %record.source_id(),
                        error = %e,
                        "item failed, continuing"
                    );
                }
            }
        }

        report.source_failures = stream.fetch_failures();
        report.duration = started.elapsed();

        tracing::info!(
            content_type = %content_type,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            duplicates = report.duplicates,
            exhausted = report.exhausted,
            duration_ms = report.duration.as_millis() as u64,
            "sync finished"
        );

        Ok(report)
    }
}
