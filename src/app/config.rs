use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    CACHE_TTL_HOURS, DEFAULT_BACKEND_URL, HTTP_REQUEST_TIMEOUT_SECS, MAX_CACHE_TTL_HOURS,
    MAX_STREAM_TIMEOUT_SECS, MIN_PROGRESS_CHECKPOINT_INTERVAL_MS, PROGRESS_CHECKPOINT_INTERVAL_MS,
    STREAM_TIMEOUT_SECS,
};
use crate::utils::PamsError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Recommendation backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Streaming analysis behaviour
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Local persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), PamsError> {
        let backend = &self.backend;
        if backend.request_timeout_secs == 0 {
            return Err(PamsError::ConfigError(
                "backend.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let analysis = &self.analysis;
        if !(1..=MAX_STREAM_TIMEOUT_SECS).contains(&analysis.stream_timeout_secs) {
            return Err(PamsError::ConfigError(format!(
                "analysis.stream_timeout_secs must be between 1 and {}, got {}",
                MAX_STREAM_TIMEOUT_SECS, analysis.stream_timeout_secs
            )));
        }
        if !(1..=MAX_CACHE_TTL_HOURS).contains(&analysis.cache_ttl_hours) {
            return Err(PamsError::ConfigError(format!(
                "analysis.cache_ttl_hours must be between 1 and {}, got {}",
                MAX_CACHE_TTL_HOURS, analysis.cache_ttl_hours
            )));
        }
        if analysis.progress_checkpoint_interval_ms < MIN_PROGRESS_CHECKPOINT_INTERVAL_MS {
            return Err(PamsError::ConfigError(
                "analysis.progress_checkpoint_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the recommendation API
    pub base_url: String,
    /// Timeout for a whole HTTP request
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Streaming analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Phase 1 must finish within this many seconds
    pub stream_timeout_secs: u64,
    /// Cached results older than this are ignored
    pub cache_ttl_hours: i64,
    /// Spacing of the phase 2 progress checkpoints
    pub progress_checkpoint_interval_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stream_timeout_secs: STREAM_TIMEOUT_SECS,
            cache_ttl_hours: CACHE_TTL_HOURS,
            progress_checkpoint_interval_ms: PROGRESS_CHECKPOINT_INTERVAL_MS,
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where cache and bookings live (platform data dir when unset)
    pub data_dir: Option<PathBuf>,
    /// Maximum bytes the store may hold
    pub quota_bytes: Option<usize>,
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    // Get config directories
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from(".pams/config.toml");

    // Build figment configuration
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    // Add global config if it exists
    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    // Add local config if it exists
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    // Add environment variables (PAMS_ prefix, PAMS_BACKEND__BASE_URL style nesting)
    figment = figment.merge(Env::prefixed("PAMS_").split("__"));

    let config: Config = figment
        .extract()
        .context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit file, still honouring PAMS_ overrides
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PAMS_").split("__"))
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "pams") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("pams");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
    }

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.analysis.stream_timeout_secs, 30);
        assert_eq!(config.analysis.cache_ttl_hours, 24);
        assert_eq!(config.storage.data_dir, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.backend.base_url = "http://api.example:9000".to_string();
        config.storage.quota_bytes = Some(5 * 1024 * 1024);
        save_config(&config, Some(path.clone())).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.backend.base_url, "http://api.example:9000");
        assert_eq!(loaded.storage.quota_bytes, Some(5 * 1024 * 1024));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\nstream_timeout_secs = 10\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.analysis.stream_timeout_secs, 10);
        assert_eq!(loaded.analysis.cache_ttl_hours, 24);
        assert_eq!(loaded.backend, BackendConfig::default());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_checkpoint_interval_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\nprogress_checkpoint_interval_ms = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(
            err.to_string().contains("progress_checkpoint_interval_ms"),
            "{}",
            err
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut config = Config::default();
        config.analysis.stream_timeout_secs = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.stream_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.cache_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.cache_ttl_hours = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config_from(Path::new("/nonexistent/pams.toml")).is_err());
    }
}
