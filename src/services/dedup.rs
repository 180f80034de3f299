use std::collections::HashSet;

use crate::models::{CandidateRecord, CatalogEntry, ContentType};

/// Admission verdict for a candidate within one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate,
}

/// Collapses candidates sharing a source-native id within one sync run.
///
/// Only intra-run duplicates are rejected here; a candidate already present
/// in the catalog from an earlier run passes through and is made harmless by
/// the upsert in the persistence step.
#[derive(Default)]
pub struct Deduplicator {
    seen: HashSet<(ContentType, String)>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, record: &CandidateRecord) -> Admission {
        let key = (record.content_type(), record.source_id());
        if self.seen.insert(key) {
            Admission::Accepted
        } else {
            Admission::Duplicate
        }
    }

    /// Distinct source ids admitted so far in this run.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
