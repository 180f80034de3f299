use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

pub mod interaction;

pub use interaction::{
    Interaction, InteractionKind, NewInteraction, NewRating, Rating, TrackOutcome, MAX_RATING,
    MIN_RATING,
};

/// Discriminator between the two parallel catalog variants.
///
/// Always serialized as the lowercase strings `"movie"` / `"book"`, matching
/// what the serving layer sends; numeric codes are never accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Book,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::Book => write!(f, "book"),
        }
    }
}

impl FromStr for ContentType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "book" => Ok(ContentType::Book),
            other => Err(EngineError::Validation(format!(
                "unknown content type '{}', expected 'movie' or 'book'",
                other
            ))),
        }
    }
}

/// Uniform access to the fields shared by both catalog variants.
///
/// Movie and book candidates carry different type-specific fields, but the
/// pipeline only ever needs identity, a title, and the text fed to the
/// embedding model; both variants expose those through this trait.
pub trait CatalogEntry {
    /// Source-native identifier, unique per content type.
    fn source_id(&self) -> String;
    fn content_type(&self) -> ContentType;
    fn title(&self) -> &str;
    /// Untruncated text used to compute the embedding for this entry.
    fn embedding_text(&self) -> String;
}

/// Movie candidate normalized from the TMDB discover payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieCandidate {
    pub tmdb_id: i64,
    pub title: String,
    pub overview: String,
    pub release_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub origin_country: Vec<String>,
    pub poster_url: Option<String>,
}

/// Book candidate normalized from the Google Books volume payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BookCandidate {
    pub google_id: String,
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published_date: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl CatalogEntry for MovieCandidate {
    fn source_id(&self) -> String {
        self.tmdb_id.to_string()
    }

    fn content_type(&self) -> ContentType {
        ContentType::Movie
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn embedding_text(&self) -> String {
        format!("{}. {}", self.title, self.overview)
    }
}

impl CatalogEntry for BookCandidate {
    fn source_id(&self) -> String {
        self.google_id.clone()
    }

    fn content_type(&self) -> ContentType {
        ContentType::Book
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn embedding_text(&self) -> String {
        if self.categories.is_empty() {
            format!("{}. {}", self.title, self.description)
        } else {
            format!(
                "{}. {} {}",
                self.title,
                self.description,
                self.categories.join(", ")
            )
        }
    }
}

/// A raw catalog candidate from either content source.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateRecord {
    Movie(MovieCandidate),
    Book(BookCandidate),
}

impl CandidateRecord {
    /// Whether the candidate carries enough text to be worth embedding.
    /// Records without both a title and an overview/description are skipped.
    pub fn has_embeddable_text(&self) -> bool {
        match self {
            CandidateRecord::Movie(m) => {
                !m.title.trim().is_empty() && !m.overview.trim().is_empty()
            }
            CandidateRecord::Book(b) => {
                !b.title.trim().is_empty() && !b.description.trim().is_empty()
            }
        }
    }
}

impl CatalogEntry for CandidateRecord {
    fn source_id(&self) -> String {
        match self {
            CandidateRecord::Movie(m) => m.source_id(),
            CandidateRecord::Book(b) => b.source_id(),
        }
    }

    fn content_type(&self) -> ContentType {
        match self {
            CandidateRecord::Movie(m) => m.content_type(),
            CandidateRecord::Book(b) => b.content_type(),
        }
    }

    fn title(&self) -> &str {
        match self {
            CandidateRecord::Movie(m) => m.title(),
            CandidateRecord::Book(b) => b.title(),
        }
    }

    fn embedding_text(&self) -> String {
        match self {
            CandidateRecord::Movie(m) => m.embedding_text(),
            CandidateRecord::Book(b) => b.embedding_text(),
        }
    }
}

/// A persisted catalog entry with its embedding.
///
/// The internal `id` is assigned by the store on first sight of a
/// (content type, source id) pair and never changes on later upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub content_type: ContentType,
    pub source_id: String,
    pub title: String,
    /// Movie overview or book description.
    pub description: String,
    /// Empty for movies.
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub language: Option<String>,
    /// Release date for movies, published date for books; source formatting.
    pub released: Option<String>,
    pub image_url: Option<String>,
    pub embedding: Vec<f32>,
}

/// Fields for an insert-or-update of a catalog entry, keyed by
/// (content type, source id). The store assigns the internal id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogItem {
    pub content_type: ContentType,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub language: Option<String>,
    pub released: Option<String>,
    pub image_url: Option<String>,
    pub embedding: Vec<f32>,
}

impl NewCatalogItem {
    /// Assembles the upsert payload for a candidate and its embedding.
    pub fn from_candidate(record: &CandidateRecord, embedding: Vec<f32>) -> Self {
        match record {
            CandidateRecord::Movie(m) => NewCatalogItem {
                content_type: ContentType::Movie,
                source_id: m.tmdb_id.to_string(),
                title: m.title.clone(),
                description: m.overview.clone(),
                authors: Vec::new(),
                categories: Vec::new(),
                language: m.language.clone(),
                released: m.release_date.map(|d| d.to_string()),
                image_url: m.poster_url.clone(),
                embedding,
            },
            CandidateRecord::Book(b) => NewCatalogItem {
                content_type: ContentType::Book,
                source_id: b.google_id.clone(),
                title: b.title.clone(),
                description: b.description.clone(),
                authors: b.authors.clone(),
                categories: b.categories.clone(),
                language: None,
                released: b.published_date.clone(),
                image_url: b.thumbnail_url.clone(),
                embedding,
            },
        }
    }
}

/// A catalog item paired with its similarity to a query embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    pub item: CatalogItem,
    pub similarity: f32,
}

// ============================================================================
// TMDB API Types
// ============================================================================

const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Raw TMDB discover result entry
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
}

/// Raw TMDB discover page
#[derive(Debug, Deserialize)]
pub struct TmdbDiscoverResponse {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
    #[serde(default)]
    pub total_pages: u32,
}

impl From<TmdbMovie> for MovieCandidate {
    fn from(raw: TmdbMovie) -> Self {
        let release_date = raw
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        let poster_url = raw
            .poster_path
            .as_deref()
            .map(|p| format!("{}{}", TMDB_POSTER_BASE, p));

        MovieCandidate {
            tmdb_id: raw.id,
            title: raw.title.unwrap_or_default(),
            overview: raw.overview.unwrap_or_default(),
            release_date,
            language: raw.original_language,
            origin_country: raw.origin_country,
            poster_url,
        }
    }
}

// ============================================================================
// Google Books API Types
// ============================================================================

/// Raw Google Books volume entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolume {
    pub id: String,
    #[serde(default)]
    pub volume_info: GoogleVolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolumeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub image_links: Option<GoogleImageLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleImageLinks {
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Raw Google Books volumes page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolumesResponse {
    #[serde(default)]
    pub items: Vec<GoogleVolume>,
    #[serde(default)]
    pub total_items: i64,
}

impl From<GoogleVolume> for BookCandidate {
    fn from(raw: GoogleVolume) -> Self {
        let info = raw.volume_info;
        BookCandidate {
            google_id: raw.id,
            title: info.title.unwrap_or_default(),
            description: info.description.unwrap_or_default(),
            authors: info.authors,
            categories: info.categories,
            published_date: info.published_date,
            thumbnail_url: info.image_links.and_then(|l| l.thumbnail),
        }
    }
}
