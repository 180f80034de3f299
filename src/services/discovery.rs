use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{CandidateRecord, ContentType};
use crate::services::providers::ContentSource;

/// Pages fetched per (strategy, dimension[, window]) combination before
/// advancing to the next one.
pub const MAX_PAGES_PER_COMBINATION: u32 = 5;

/// Movie discovery strategies, each mapped to a TMDB discover sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieStrategy {
    Recent,
    Popular,
    TopRated,
    BoxOffice,
}

impl MovieStrategy {
    pub fn all() -> [MovieStrategy; 4] {
        [
            MovieStrategy::Recent,
            MovieStrategy::Popular,
            MovieStrategy::TopRated,
            MovieStrategy::BoxOffice,
        ]
    }

    pub fn sort_param(&self) -> &'static str {
        match self {
            MovieStrategy::Recent => "primary_release_date.desc",
            MovieStrategy::Popular => "popularity.desc",
            MovieStrategy::TopRated => "vote_average.desc",
            MovieStrategy::BoxOffice => "revenue.desc",
        }
    }
}

/// Book discovery orderings offered by the volumes API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStrategy {
    Newest,
    Relevance,
}

impl BookStrategy {
    pub fn all() -> [BookStrategy; 2] {
        [BookStrategy::Newest, BookStrategy::Relevance]
    }

    pub fn order_param(&self) -> &'static str {
        match self {
            BookStrategy::Newest => "newest",
            BookStrategy::Relevance => "relevance",
        }
    }
}

/// Release-year partition for movie discovery. An open upper bound means
/// "up to the present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub from: i32,
    pub to: Option<i32>,
}

/// The fixed year partitions crawled for movies.
pub fn year_windows() -> [YearWindow; 3] {
    [
        YearWindow { from: 2000, to: Some(2009) },
        YearWindow { from: 2010, to: Some(2019) },
        YearWindow { from: 2020, to: None },
    ]
}

/// Regional original-language partitions crawled for movies.
pub fn movie_languages() -> &'static [&'static str] {
    &["hi", "te", "ta", "kn", "ml", "pa", "bn", "mr"]
}

/// Category partitions crawled for books.
pub fn book_categories() -> &'static [&'static str] {
    &[
        "fiction", "mystery", "history", "science", "biography", "thriller",
        "philosophy", "technology", "romance", "fantasy", "business", "travel",
        "self-help", "poetry", "art",
    ]
}

/// One combination in the query-plan space.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Movies {
        strategy: MovieStrategy,
        language: String,
        window: YearWindow,
    },
    Books {
        strategy: BookStrategy,
        category: String,
    },
}

/// Enumerates the full cross product of query plans for a content type.
pub fn query_plans(content_type: ContentType) -> Vec<QueryPlan> {
    match content_type {
        ContentType::Movie => {
            let mut plans = Vec::new();
            for strategy in MovieStrategy::all() {
                for language in movie_languages() {
                    for window in year_windows() {
                        plans.push(QueryPlan::Movies {
                            strategy,
                            language: language.to_string(),
                            window,
                        });
                    }
                }
            }
            plans
        }
        ContentType::Book => {
            let mut plans = Vec::new();
            for strategy in BookStrategy::all() {
                for category in book_categories() {
                    plans.push(QueryPlan::Books {
                        strategy,
                        category: category.to_string(),
                    });
                }
            }
            plans
        }
    }
}

/// Position in the query-plan space. A stream can resume from any cursor, so
/// an interrupted run picks up where it left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryCursor {
    /// Index into the enumerated plan combinations.
    pub combination: usize,
    /// 1-based page within the current combination.
    pub page: u32,
}

impl Default for DiscoveryCursor {
    fn default() -> Self {
        Self {
            combination: 0,
            page: 1,
        }
    }
}

/// Lazy sequence of raw candidates across the whole query-plan space.
///
/// Pages are pulled on demand; a combination ends when the source reports no
/// more results or the page cap is hit. Permanent per-request source errors
/// skip the combination and are counted; auth failures propagate.
pub struct CandidateStream {
    source: Arc<dyn ContentSource>,
    plans: Vec<QueryPlan>,
    cursor: DiscoveryCursor,
    buffer: VecDeque<CandidateRecord>,
    max_pages: u32,
    fetch_failures: usize,
}

impl CandidateStream {
    pub fn new(source: Arc<dyn ContentSource>, content_type: ContentType) -> Self {
        Self::resume(source, content_type, DiscoveryCursor::default())
    }

    pub fn resume(
        source: Arc<dyn ContentSource>,
        content_type: ContentType,
        cursor: DiscoveryCursor,
    ) -> Self {
        Self {
            source,
            plans: query_plans(content_type),
            cursor,
            buffer: VecDeque::new(),
            max_pages: MAX_PAGES_PER_COMBINATION,
            fetch_failures: 0,
        }
    }

    pub fn cursor(&self) -> DiscoveryCursor {
        self.cursor
    }

    /// Combinations skipped because of permanent source errors.
    pub fn fetch_failures(&self) -> usize {
        self.fetch_failures
    }

    fn advance_combination(&mut self) {
        self.cursor.combination += 1;
        self.cursor.page = 1;
    }

    /// Next raw candidate, pulling pages lazily. `Ok(None)` once every
    /// combination is exhausted.
    pub async fn next(&mut self) -> EngineResult<Option<CandidateRecord>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.cursor.combination >= self.plans.len() {
                return Ok(None);
            }
            if self.cursor.page > self.max_pages {
                self.advance_combination();
                continue;
            }

            let plan = self.plans[self.cursor.combination].clone();
            match self.source.fetch(&plan, self.cursor.page).await {
                Ok(page) => {
                    let empty = page.records.is_empty();
                    self.buffer.extend(page.records);
                    if empty || !page.has_more {
                        self.advance_combination();
                    } else {
                        self.cursor.page += 1;
                    }
                }
                Err(e) if e.is_fatal_for_sync() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = self.source.name(),
                        combination = self.cursor.combination,
                        page = self.cursor.page,
                        error = %e,
                        "source fetch failed, skipping combination"
                    );
                    self.fetch_failures += 1;
                    self.advance_combination();
                }
            }
        }
    }
}
