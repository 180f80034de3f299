//! Catalog sync and recommendation engine for Indian movies and books.
//!
//! The sync half crawls TMDB and Google Books under a shared rate limit,
//! deduplicates candidates, embeds their text and upserts them into a
//! pgvector-backed catalog. The recommendation half serves semantic search,
//! rating-based popularity and user-user collaborative filtering over that
//! catalog.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{EngineError, EngineResult};
