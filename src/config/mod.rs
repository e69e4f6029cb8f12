use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bearer token granting admin access without a session, for automation
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
    /// Username of the admin account seeded into an empty database
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    /// Password for the seeded admin; generated and logged when unset
    pub admin_password: Option<String>,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: default_admin_token(),
            admin_username: default_admin_username(),
            admin_password: None,
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_token() -> String {
    // Generate a random token if not provided
    uuid::Uuid::new_v4().to_string()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// TMDB API key; catalog requests fail gracefully when empty
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    /// Timeout for catalog requests in seconds (default: 10)
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
    /// Maximum concurrent per-movie lookups when enriching a watchlist (default: 4)
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_catalog_base_url(),
            timeout_secs: default_catalog_timeout(),
            fanout_concurrency: default_fanout_concurrency(),
        }
    }
}

fn default_catalog_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_catalog_timeout() -> u64 {
    10
}

fn default_fanout_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.data_dir, PathBuf::from("./data"));
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.catalog.fanout_concurrency, 4);
        assert_eq!(config.auth.admin_username, "admin");
        assert_eq!(config.auth.session_ttl_days, 7);
        assert!(config.auth.admin_password.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_file() {
        let toml = r#"
            [server]
            port = 3000

            [catalog]
            api_key = "abc123"
            fanout_concurrency = 8

            [auth]
            admin_password = "hunter2hunter2"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        // Unspecified fields keep their defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog.api_key, "abc123");
        assert_eq!(config.catalog.fanout_concurrency, 8);
        assert_eq!(config.catalog.timeout_secs, 10);
        assert_eq!(config.auth.admin_password.as_deref(), Some("hunter2hunter2"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/reelist.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
