use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::{Algorithm, DEFAULT_GRAPH_CACHE};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kinship: KinshipConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Engine and persistence settings
#[derive(Debug, Clone, Deserialize)]
pub struct KinshipConfig {
    /// SQLite file holding the persisted snapshot. Without it the server
    /// keeps everything in memory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,
}

/// Graph cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Number of built graph revisions kept around.
    #[serde(default = "default_graph_capacity")]
    pub graph_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            graph_capacity: default_graph_capacity(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_algorithm() -> String {
    Algorithm::default().to_string()
}

fn default_graph_capacity() -> usize {
    DEFAULT_GRAPH_CACHE
}

fn default_http_enabled() -> bool {
    false
}

fn default_http_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    // Empty means any origin (local dev)
    vec![]
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KINSHIP_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KINSHIP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load and validate a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Invalid TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        self.default_algorithm()?;

        if self.cache.graph_capacity == 0 {
            anyhow::bail!("cache.graph_capacity must be greater than 0");
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        if let Some(ref db_path) = self.kinship.db_path {
            if db_path.is_dir() {
                anyhow::bail!(
                    "kinship.db_path must be a file, not a directory: {}",
                    db_path.display()
                );
            }
        }

        Ok(())
    }

    /// Parsed default algorithm
    pub fn default_algorithm(&self) -> Result<Algorithm> {
        self.kinship
            .default_algorithm
            .parse::<Algorithm>()
            .with_context(|| "kinship.default_algorithm must be one of dfs, bfs, dijkstra")
    }

    /// Get database path
    pub fn db_path(&self) -> Option<&Path> {
        self.kinship.db_path.as_deref()
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.kinship.migrations_dir
    }
}
