use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::graph::SearchLimits;

/// Hard ceiling for any traversal depth accepted over HTTP.
pub const MAX_SEARCH_DEPTH: usize = 5;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub flavorgraph: CoreConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Storage and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Graph search bounds
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_connection_depth")]
    pub default_connection_depth: usize,
    #[serde(default = "default_path_depth")]
    pub default_path_depth: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Upper bound on entities a single search may visit
    #[serde(default = "default_max_visited")]
    pub max_visited: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_connection_depth: default_connection_depth(),
            default_path_depth: default_path_depth(),
            max_depth: default_max_depth(),
            max_visited: default_max_visited(),
        }
    }
}

impl GraphConfig {
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_visited: self.max_visited,
            ..SearchLimits::default()
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            allowed_origins: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Bulk import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connection_depth() -> usize {
    2
}

fn default_path_depth() -> usize {
    3
}

fn default_max_depth() -> usize {
    MAX_SEARCH_DEPTH
}

fn default_max_visited() -> usize {
    10_000
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    500
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FLAVORGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("FLAVORGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let graph = &self.graph;
        if graph.max_depth == 0 || graph.max_depth > MAX_SEARCH_DEPTH {
            anyhow::bail!(
                "graph.max_depth must be between 1 and {}, got {}",
                MAX_SEARCH_DEPTH,
                graph.max_depth
            );
        }

        for (name, value) in [
            ("default_connection_depth", graph.default_connection_depth),
            ("default_path_depth", graph.default_path_depth),
        ] {
            if value == 0 || value > graph.max_depth {
                anyhow::bail!(
                    "graph.{} must be between 1 and graph.max_depth ({}), got {}",
                    name,
                    graph.max_depth,
                    value
                );
            }
        }

        if graph.max_visited == 0 {
            anyhow::bail!("graph.max_visited must be greater than 0");
        }

        if self.import.batch_size == 0 {
            anyhow::bail!("import.batch_size must be greater than 0");
        }

        if self.http_server.request_timeout_secs == 0 {
            anyhow::bail!("http_server.request_timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.flavorgraph.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize tests that mutate FLAVORGRAPH_CONFIG so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MINIMAL: &str = r#"
[flavorgraph]
db_path = "./test.db"
"#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.flavorgraph.log_level, "info");
        assert_eq!(config.graph.default_connection_depth, 2);
        assert_eq!(config.graph.default_path_depth, 3);
        assert_eq!(config.graph.max_depth, 5);
        assert_eq!(config.graph.max_visited, 10_000);
        assert_eq!(config.http_server.host, "127.0.0.1");
        assert_eq!(config.http_server.port, 8080);
        assert!(config.http_server.allowed_origins.is_empty());
        assert_eq!(config.import.batch_size, 500);
        assert_eq!(config.graph.limits().max_visited, 10_000);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
[flavorgraph]
db_path = "/var/lib/flavorgraph/graph.db"
log_level = "debug"

[graph]
default_connection_depth = 1
default_path_depth = 4
max_depth = 4
max_visited = 250

[http_server]
host = "0.0.0.0"
port = 9090
allowed_origins = ["https://flavorlab.example"]
request_timeout_secs = 5

[import]
batch_size = 50
"#,
        )
        .unwrap();
        assert_eq!(config.db_path(), Path::new("/var/lib/flavorgraph/graph.db"));
        assert_eq!(config.flavorgraph.log_level, "debug");
        assert_eq!(config.graph.max_depth, 4);
        assert_eq!(config.graph.max_visited, 250);
        assert_eq!(config.http_server.port, 9090);
        assert_eq!(config.http_server.allowed_origins.len(), 1);
        assert_eq!(config.import.batch_size, 50);
    }

    #[test]
    fn test_max_depth_out_of_range() {
        let err = Config::from_toml_str(
            r#"
[flavorgraph]
db_path = "./test.db"

[graph]
max_depth = 6
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("graph.max_depth"));
    }

    #[test]
    fn test_default_depth_above_max() {
        let err = Config::from_toml_str(
            r#"
[flavorgraph]
db_path = "./test.db"

[graph]
max_depth = 2
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_path_depth"));
    }

    #[test]
    fn test_zero_max_visited_rejected() {
        let err = Config::from_toml_str(
            r#"
[flavorgraph]
db_path = "./test.db"

[graph]
max_visited = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_visited"));
    }

    #[test]
    fn test_missing_db_path() {
        assert!(Config::from_toml_str("[flavorgraph]\nlog_level = \"info\"\n").is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flavorgraph.toml");
        fs::write(&config_path, MINIMAL).unwrap();

        let original = std::env::var("FLAVORGRAPH_CONFIG").ok();
        std::env::set_var("FLAVORGRAPH_CONFIG", &config_path);
        let config = Config::load();
        std::env::remove_var("FLAVORGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("FLAVORGRAPH_CONFIG", v);
        }

        let config = config.unwrap();
        assert_eq!(config.db_path(), Path::new("./test.db"));
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("FLAVORGRAPH_CONFIG").ok();
        std::env::set_var("FLAVORGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        std::env::remove_var("FLAVORGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("FLAVORGRAPH_CONFIG", v);
        }
        assert!(config.is_err());
    }
}
