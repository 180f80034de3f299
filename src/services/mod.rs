pub mod collaborative;
pub mod dedup;
pub mod discovery;
pub mod embedding;
pub mod ingest;
pub mod interactions;
pub mod popularity;
pub mod providers;
pub mod rate_limit;
pub mod similarity;
pub mod sync;

pub use collaborative::{CollaborativeRecommender, Recommendation};
pub use interactions::InteractionTracker;
pub use popularity::{PopularItem, PopularityRanker};
pub use rate_limit::RateLimiter;
pub use similarity::SimilaritySearch;
pub use sync::{CancelToken, SyncOrchestrator, SyncReport};
