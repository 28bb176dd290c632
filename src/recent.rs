//! Persisted "recently viewed" list.
//!
//! A small JSON file, written once per successful dataset load. Single
//! writer, last-write-wins; entries are de-duplicated by show id with the
//! newest view first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_ENTRIES: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentShow {
    pub imdb_id: String,
    pub title: Option<String>,
    pub poster: Option<String>,
    pub year: Option<String>,
    pub viewed_at: String,
}

#[derive(Debug, Clone)]
pub struct RecentStore {
    path: PathBuf,
}

impl RecentStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heatarr")
            .join("recent.json")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current list, newest first. A missing or unreadable file is an empty
    /// list, never an error; this data is best-effort.
    #[must_use]
    pub fn list(&self) -> Vec<RecentShow> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                debug!("Ignoring malformed recent list: {e}");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    /// Prepend a view of `imdb_id`, dropping any older entry for the same
    /// show and truncating the list.
    pub fn record(
        &self,
        imdb_id: &str,
        title: Option<String>,
        poster: Option<String>,
        year: Option<String>,
    ) -> Result<()> {
        let mut entries = self.list();
        entries.retain(|e| e.imdb_id != imdb_id);
        entries.insert(
            0,
            RecentShow {
                imdb_id: imdb_id.to_string(),
                title,
                poster,
                year,
                viewed_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        entries.truncate(MAX_ENTRIES);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
