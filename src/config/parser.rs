use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub codeforces: CodeforcesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    pub fn db_type(&self) -> DbType {
        let url = self.connection_string();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DbType::Postgres
        } else {
            DbType::Sqlite
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        if let DbType::Sqlite = self.db_type() {
            let url = self.connection_string();
            Some(url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
        } else {
            None
        }
    }

    pub fn max_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.max_connections,
            DbType::Sqlite => Some(1),
        }
    }

    pub fn min_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.min_connections,
            DbType::Sqlite => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

/// GitHub REST API v3 plus the OAuth web flow. Unauthenticated calls are
/// limited to 60 requests/hour upstream; a server token raises that to 5000.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_github_oauth_base")]
    pub oauth_base: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_github_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_github_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            oauth_base: default_github_oauth_base(),
            token: String::new(),
            webhook_secret: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            min_interval_ms: default_github_min_interval_ms(),
            timeout_secs: default_github_timeout_secs(),
        }
    }
}

/// Codeforces public API. Upstream allows 5 requests/second; the default
/// 250ms spacing stays under that.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodeforcesConfig {
    #[serde(default = "default_codeforces_api_base")]
    pub api_base: String,
    #[serde(default = "default_codeforces_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_codeforces_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CodeforcesConfig {
    fn default() -> Self {
        Self {
            api_base: default_codeforces_api_base(),
            min_interval_ms: default_codeforces_min_interval_ms(),
            timeout_secs: default_codeforces_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_file(&config_path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("HIVE_DATABASE_URL") {
            self.database.url = Some(value);
        }
        if let Ok(value) = std::env::var("HIVE_GITHUB_TOKEN") {
            self.github.token = value;
        }
        if let Ok(value) = std::env::var("HIVE_GITHUB_WEBHOOK_SECRET") {
            self.github.webhook_secret = value;
        }
        if let Ok(value) = std::env::var("HIVE_GITHUB_CLIENT_ID") {
            self.github.client_id = value;
        }
        if let Ok(value) = std::env::var("HIVE_GITHUB_CLIENT_SECRET") {
            self.github.client_secret = value;
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_oauth_base() -> String {
    "https://github.com".to_string()
}

fn default_github_min_interval_ms() -> u64 {
    100
}

fn default_github_timeout_secs() -> u64 {
    15
}

fn default_codeforces_api_base() -> String {
    "https://codeforces.com/api".to_string()
}

fn default_codeforces_min_interval_ms() -> u64 {
    250
}

fn default_codeforces_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
