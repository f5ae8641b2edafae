use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable that overrides `upstream.api_key`.
pub const API_KEY_ENV: &str = "SERPAPI_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub upstream: UpstreamConfig,

    pub cache: CacheConfig,

    pub search: SearchConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/shopper.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,

    /// Empty means unset; `SERPAPI_KEY` takes precedence when present.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    pub engine: String,

    /// Two-letter country code sent as `gl`.
    pub country: String,

    /// Two-letter language code sent as `hl`.
    pub language: String,

    pub timeout_seconds: u64,

    /// Upper bound on in-flight upstream requests.
    pub max_connections: usize,

    pub max_idle_per_host: usize,

    /// Number of results requested per upstream call.
    pub max_results: usize,

    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://serpapi.com/search".to_string(),
            api_key: String::new(),
            engine: "google_shopping".to_string(),
            country: "us".to_string(),
            language: "en".to_string(),
            timeout_seconds: 30,
            max_connections: 10,
            max_idle_per_host: 5,
            max_results: 100,
            user_agent: "Shopper/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,

    /// Interval between expired-entry sweeps; 0 disables the sweeper.
    pub purge_interval_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            purge_interval_minutes: 30,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,

    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl SearchConfig {
    /// Missing, unparseable, or non-positive limits fall back to the default;
    /// larger ones, including values too big for an integer, are capped.
    #[must_use]
    pub fn resolve_limit(&self, requested: Option<&str>) -> usize {
        let Some(raw) = requested else {
            return self.default_limit.min(self.max_limit);
        };

        let limit = match raw.trim().parse::<i64>() {
            Ok(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow) => usize::MAX,
            _ => self.default_limit,
        };
        limit.min(self.max_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "shopper".to_string());

        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                self.upstream.api_key = key.to_string();
            }
        }
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
            paths.push(config_dir.join("shopper").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shopper").join("config.toml"));
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
        if self.upstream.base_url.trim().is_empty() {
            anyhow::bail!("upstream.base_url cannot be empty");
        }

        if self.upstream.max_connections == 0 {
            anyhow::bail!("upstream.max_connections must be > 0");
        }

        if self.upstream.timeout_seconds == 0 {
            anyhow::bail!("upstream.timeout_seconds must be > 0");
        }

        if self.search.default_limit == 0 || self.search.max_limit == 0 {
            anyhow::bail!("search limits must be > 0");
        }

        if self.search.default_limit > self.search.max_limit {
            anyhow::bail!("search.default_limit cannot exceed search.max_limit");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upstream.engine, "google_shopping");
        assert_eq!(config.upstream.max_connections, 10);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[upstream]"));
        assert!(toml_str.contains("[cache]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [cache]
            ttl_seconds = 60
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.cache.ttl(), chrono::Duration::seconds(60));
        assert_eq!(config.cache.purge_interval_minutes, 30);

        assert_eq!(config.upstream.base_url, "https://serpapi.com/search");
    }

    #[test]
    fn test_resolve_limit() {
        let search = SearchConfig::default();
        assert_eq!(search.resolve_limit(None), 20);
        assert_eq!(search.resolve_limit(Some("5")), 5);
        assert_eq!(search.resolve_limit(Some("0")), 20);
        assert_eq!(search.resolve_limit(Some("-3")), 20);
        assert_eq!(search.resolve_limit(Some("abc")), 20);
        assert_eq!(search.resolve_limit(Some("500")), 100);
        assert_eq!(search.resolve_limit(Some("99999999999999999999")), 100);
        assert_eq!(search.resolve_limit(Some("-99999999999999999999")), 20);
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = Config::default();
        config.search.default_limit = 200;
        assert!(config.validate().is_err());
    }
}
