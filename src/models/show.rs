use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque external key identifying a show (an IMDb id such as `tt0903747`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowIdentity(String);

impl ShowIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Loose shape check for IMDb title ids (`tt` followed by digits).
    #[must_use]
    pub fn looks_like_imdb_id(text: &str) -> bool {
        text.len() > 2 && text.starts_with("tt") && text[2..].chars().all(|c| c.is_ascii_digit())
    }
}

impl fmt::Display for ShowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw metadata payload as served by `/getShowMeta` and `/getShowByTitle`.
/// Key casing follows the OMDb passthrough on the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaPayload {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Poster")]
    pub poster: Option<String>,
    #[serde(rename = "Plot")]
    pub plot: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(rename = "totalSeasons")]
    pub total_seasons: Option<String>,
    #[serde(rename = "Genre")]
    pub genre: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    pub error: Option<String>,
}

/// Resolved show metadata held by the sync controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowMetadata {
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    pub poster: Option<String>,
    pub plot: Option<String>,
    pub total_seasons: Option<u32>,
    pub genres: Vec<String>,
    pub imdb_rating: Option<f64>,
}

fn non_placeholder(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "N/A")
}

impl From<MetaPayload> for ShowMetadata {
    fn from(payload: MetaPayload) -> Self {
        Self {
            imdb_id: non_placeholder(payload.imdb_id),
            title: non_placeholder(payload.title),
            year: non_placeholder(payload.year),
            poster: non_placeholder(payload.poster),
            plot: non_placeholder(payload.plot),
            total_seasons: payload.total_seasons.and_then(|s| s.parse().ok()),
            genres: payload
                .genre
                .map(|g| g.split(", ").map(str::to_string).collect())
                .unwrap_or_default(),
            imdb_rating: payload.imdb_rating.and_then(|r| r.parse().ok()),
        }
    }
}

impl ShowMetadata {
    /// Superset merge: incoming fields overlay, existing fields survive when
    /// the new payload omits them. A refresh never downgrades the record.
    pub fn absorb(&mut self, incoming: Self) {
        if incoming.imdb_id.is_some() {
            self.imdb_id = incoming.imdb_id;
        }
        if incoming.title.is_some() {
            self.title = incoming.title;
        }
        if incoming.year.is_some() {
            self.year = incoming.year;
        }
        if incoming.poster.is_some() {
            self.poster = incoming.poster;
        }
        if incoming.plot.is_some() {
            self.plot = incoming.plot;
        }
        if incoming.total_seasons.is_some() {
            self.total_seasons = incoming.total_seasons;
        }
        if !incoming.genres.is_empty() {
            self.genres = incoming.genres;
        }
        if incoming.imdb_rating.is_some() {
            self.imdb_rating = incoming.imdb_rating;
        }
    }
}

/// One episode row. Identity within a show is the (season, episode) pair,
/// never the array position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub imdb_id: String,
}

impl Episode {
    #[must_use]
    pub fn key(&self) -> (u32, u32) {
        (self.season, self.episode)
    }
}

/// Wire shape of `/getShow` responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPayload {
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    pub total_seasons: Option<u32>,
    #[serde(default)]
    pub partial_data: bool,
    #[serde(default)]
    pub incomplete: bool,
    #[serde(default)]
    pub metadata_stale: bool,
    #[serde(default)]
    pub episodes_stale_count: u32,
    #[serde(default)]
    pub missing_refresh_in_progress: bool,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    pub error: Option<String>,
}

/// Full episode dataset for one show, plus the server status flags mirrored
/// verbatim. `partial_data` and `incomplete` are independent; neither implies
/// the other. Episodes are `Arc`ed so an unchanged row survives a merge with
/// its pointer identity intact.
#[derive(Debug, Clone)]
pub struct ShowDataset {
    pub imdb_id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub total_seasons: Option<u32>,
    pub partial_data: bool,
    pub incomplete: bool,
    pub metadata_stale: bool,
    pub episodes_stale_count: u32,
    pub missing_refresh_in_progress: bool,
    pub episodes: Vec<Arc<Episode>>,
}

impl From<ShowPayload> for ShowDataset {
    fn from(payload: ShowPayload) -> Self {
        Self {
            imdb_id: payload.imdb_id.unwrap_or_default(),
            title: payload.title,
            year: payload.year,
            total_seasons: payload.total_seasons,
            partial_data: payload.partial_data,
            incomplete: payload.incomplete,
            metadata_stale: payload.metadata_stale,
            episodes_stale_count: payload.episodes_stale_count,
            missing_refresh_in_progress: payload.missing_refresh_in_progress,
            episodes: payload.episodes.into_iter().map(Arc::new).collect(),
        }
    }
}

impl ShowDataset {
    /// True while the server still has enrichment work outstanding for this
    /// dataset. Literal flag semantics: `incomplete` alone keeps this true.
    #[must_use]
    pub fn enrichment_pending(&self) -> bool {
        self.partial_data || self.incomplete || self.missing_refresh_in_progress
    }
}

/// Autocomplete suggestion from `/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSuggestion {
    pub title: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
