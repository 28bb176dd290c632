use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Override for the recently-viewed list location. Empty means the
    /// platform data directory.
    pub recent_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            recent_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the heatmap backend.
    pub base_url: String,

    pub http_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            http_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay between enrichment poll ticks.
    pub poll_interval_ms: u64,

    /// Upper bound on poll ticks per sequence; bounds total polling time,
    /// not individual request latency.
    pub max_poll_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            max_poll_attempts: 20,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("heatarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".heatarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.is_empty() {
            anyhow::bail!("Server base URL cannot be empty");
        }

        if self.sync.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be > 0");
        }

        if self.sync.max_poll_attempts == 0 {
            anyhow::bail!("Max poll attempts must be > 0");
        }

        Ok(())
    }

    #[must_use]
    pub fn recent_path(&self) -> PathBuf {
        if self.general.recent_path.is_empty() {
            crate::recent::RecentStore::default_path()
        } else {
            PathBuf::from(&self.general.recent_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.poll_interval_ms, 5000);
        assert_eq!(config.sync.max_poll_attempts, 20);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.server.base_url, config.server.base_url);
        assert_eq!(parsed.sync.max_poll_attempts, config.sync.max_poll_attempts);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config =
            toml::from_str("[server]\nbase_url = \"http://backend:8080\"\n").unwrap();
        assert_eq!(parsed.server.base_url, "http://backend:8080");
        assert_eq!(parsed.sync.poll_interval_ms, 5000);
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = Config::default();
        config.sync.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
