use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

// ============================================================================
// Watchlist Types
// ============================================================================

/// Genre selector for watchlist pages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GenreKey {
    /// The whole watchlist, unfiltered
    #[default]
    Any,
    /// Provider-relative path of a genre-filtered listing
    Path(String),
}

impl From<&str> for GenreKey {
    fn from(key: &str) -> Self {
        match key.trim() {
            "" | "any" => GenreKey::Any,
            path => GenreKey::Path(path.to_string()),
        }
    }
}

impl Display for GenreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenreKey::Any => write!(f, "any"),
            GenreKey::Path(path) => write!(f, "{}", path),
        }
    }
}

/// A genre offered by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub label: String,
    pub key: String,
}

impl Genre {
    /// Synthetic entry selecting the whole watchlist
    pub fn any() -> Self {
        Self {
            label: "Any Genre".to_string(),
            key: "any".to_string(),
        }
    }

    pub fn genre_key(&self) -> GenreKey {
        GenreKey::from(self.key.as_str())
    }
}

/// One watchlist entry as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub guid: String,
    pub title: String,
    pub duration_secs: u32,
}

/// One page of the watchlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistPage {
    /// Number of items the provider reported for this page
    pub size: usize,
    pub items: Vec<WatchlistItem>,
}

/// Inclusive movie length window in seconds; `max: None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl Default for DurationRange {
    fn default() -> Self {
        Self::ANY
    }
}

impl DurationRange {
    pub const ANY: DurationRange = DurationRange { min: 0, max: None };

    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, duration_secs: u32) -> bool {
        duration_secs >= self.min && self.max.map_or(true, |max| duration_secs <= max)
    }

    /// Named length categories offered to participants
    pub fn preset(name: &str) -> Option<Self> {
        let range = match name {
            "any" => Self::ANY,
            "short" => Self::new(0, Some(105 * 60)),
            "standard" => Self::new(106 * 60, Some(135 * 60)),
            "long" => Self::new(136 * 60, Some(165 * 60)),
            "epic" => Self::new(166 * 60, None),
            _ => return None,
        };
        Some(range)
    }
}

// ============================================================================
// Movie Metadata Types
// ============================================================================

/// Artwork URLs attached to a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieImages {
    pub background: Option<String>,
    pub banner: Option<String>,
    pub clear_logo: Option<String>,
    pub clear_logo_wide: Option<String>,
    pub cover_art: Option<String>,
    pub cover_poster: Option<String>,
    pub cover_square: Option<String>,
    pub snapshot: Option<String>,
}

impl MovieImages {
    /// Sets the slot matching a catalog image type; unknown types are ignored
    pub fn set(&mut self, image_type: &str, url: String) {
        let slot = match image_type {
            "background" => &mut self.background,
            "banner" => &mut self.banner,
            "clearLogo" => &mut self.clear_logo,
            "clearLogoWide" => &mut self.clear_logo_wide,
            "coverArt" => &mut self.cover_art,
            "coverPoster" => &mut self.cover_poster,
            "coverSquare" => &mut self.cover_square,
            "snapshot" => &mut self.snapshot,
            _ => return,
        };
        *slot = Some(url);
    }

    /// Wide artwork used as a cover, snapshot first
    pub fn cover(&self) -> Option<&str> {
        self.snapshot.as_deref().or(self.background.as_deref())
    }
}

/// Who issued a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingSource {
    #[serde(rename = "imdb")]
    Imdb,
    #[serde(rename = "rottentomatoesCritic")]
    RottenTomatoesCritic,
    #[serde(rename = "rottentomatoesAudience")]
    RottenTomatoesAudience,
    #[serde(rename = "rottentomatoes")]
    RottenTomatoes,
    #[serde(rename = "themoviedb")]
    TheMovieDb,
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub source: RatingSource,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Full catalog metadata for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub guid: String,
    pub title: String,
    pub summary: Option<String>,
    /// Shortened summaries, keyed by their character budget
    #[serde(default)]
    pub summary_100: Option<String>,
    #[serde(default)]
    pub summary_250: Option<String>,
    #[serde(default)]
    pub summary_500: Option<String>,
    pub tagline: Option<String>,
    pub thumb: Option<String>,
    pub year: Option<i32>,
    /// Runtime in milliseconds
    pub duration: Option<u64>,
    pub images: MovieImages,
    pub genres: Vec<String>,
    pub ratings: Vec<Rating>,
    pub guids: Vec<String>,
    pub countries: Vec<String>,
    pub director: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl MovieDetails {
    /// Bare details for a movie the catalog knows nothing more about
    pub fn untitled(guid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            summary: None,
            summary_100: None,
            summary_250: None,
            summary_500: None,
            tagline: None,
            thumb: None,
            year: None,
            duration: None,
            images: MovieImages::default(),
            genres: Vec::new(),
            ratings: Vec::new(),
            guids: Vec::new(),
            countries: Vec::new(),
            director: None,
            fetched_at: Utc::now(),
        }
    }
}
