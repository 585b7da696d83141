//! Configuration module for the paladin server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::protocols::http::Status;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the server
#[derive(Parser, Debug, Default)]
#[command(name = "paladin")]
#[command(author = "paladin authors")]
#[command(version = "0.1.0")]
#[command(about = "A single-resource HTTP/1.1 server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:8080)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Path of the served resource file
    #[arg(short = 'r', long)]
    pub resource: Option<PathBuf>,

    /// Number of reactor threads
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum concurrent connections per reactor
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(long)]
    pub idle_timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub buffers: BufferConfig,
    #[serde(default)]
    pub resource: ResourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of reactor threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Connection slots per reactor
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Readiness events fetched per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Idle connection timeout in milliseconds
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: default_workers(),
            max_connections: default_max_connections(),
            batch_size: default_batch_size(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

/// Per-connection buffer sizing
#[derive(Debug, Deserialize)]
pub struct BufferConfig {
    /// Inbound (request) buffer capacity in bytes
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Outbound (response) buffer capacity in bytes
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: default_read_buffer_size(),
            write_buffer_size: default_write_buffer_size(),
        }
    }
}

/// Resource-related configuration
#[derive(Debug, Deserialize)]
pub struct ResourceConfig {
    /// Path of the resource file
    #[serde(default = "default_resource_path")]
    pub path: PathBuf,
    /// Maximum number of bytes returned by GET
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            path: default_resource_path(),
            max_read_size: default_max_read_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_max_connections() -> usize {
    1024
}

fn default_batch_size() -> usize {
    10
}

fn default_idle_timeout_ms() -> u64 {
    30_000
}

fn default_read_buffer_size() -> usize {
    8 * 1024
}

fn default_write_buffer_size() -> usize {
    64 * 1024
}

fn default_resource_path() -> PathBuf {
    PathBuf::from("risorsa.html")
}

fn default_max_read_size() -> usize {
    60 * 1024 // leaves room for the status line and header
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub workers: usize,
    pub max_connections: usize,
    pub batch_size: usize,
    pub idle_timeout_ms: u64,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    pub resource_path: PathBuf,
    pub max_read_size: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let write_buffer_size = toml_config.buffers.write_buffer_size.max(1);
        // A full GET response has to fit the outbound buffer
        let max_read_size = toml_config
            .resource
            .max_read_size
            .min(write_buffer_size.saturating_sub(Status::Ok.head_len()));

        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            workers: cli.workers.unwrap_or(toml_config.server.workers).max(1),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            batch_size: toml_config.server.batch_size.max(1),
            idle_timeout_ms: cli
                .idle_timeout_ms
                .unwrap_or(toml_config.server.idle_timeout_ms),
            read_buffer_size: toml_config.buffers.read_buffer_size.max(1),
            write_buffer_size,
            resource_path: cli.resource.unwrap_or(toml_config.resource.path),
            max_read_size,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(
            CliArgs {
                log_level: default_log_level(),
                ..CliArgs::default()
            },
            TomlConfig::default(),
        )
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.workers, 1);
        assert_eq!(config.resource_path, PathBuf::from("risorsa.html"));
        assert_eq!(config.idle_timeout_ms, 30_000);
        assert!(config.max_read_size < config.write_buffer_size);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:9090"
            workers = 4
            idle_timeout_ms = 0

            [buffers]
            read_buffer_size = 1024

            [resource]
            path = "/tmp/page.html"
            max_read_size = 512

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9090");
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.server.idle_timeout_ms, 0);
        assert_eq!(config.server.batch_size, 10);
        assert_eq!(config.buffers.read_buffer_size, 1024);
        assert_eq!(config.buffers.write_buffer_size, 64 * 1024);
        assert_eq!(config.resource.path, PathBuf::from("/tmp/page.html"));
        assert_eq!(config.resource.max_read_size, 512);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:9090"
            workers = 4

            [resource]
            path = "from-file.html"

            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let cli = CliArgs::parse_from([
            "paladin",
            "--listen",
            "127.0.0.1:7070",
            "--resource",
            "from-cli.html",
            "--log-level",
            "trace",
        ]);

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.listen, "127.0.0.1:7070");
        assert_eq!(config.workers, 4);
        assert_eq!(config.resource_path, PathBuf::from("from-cli.html"));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs::parse_from(["paladin", "--config", "/nonexistent/paladin.toml"]);
        match Config::from_cli(cli) {
            Err(ConfigError::FileRead(path, _)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/paladin.toml"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_max_read_size_fits_write_buffer() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [buffers]
            write_buffer_size = 1024

            [resource]
            max_read_size = 4096
        "#,
        )
        .unwrap();

        let config = Config::merge(CliArgs::default(), toml_config);
        assert_eq!(config.write_buffer_size, 1024);
        assert_eq!(config.max_read_size, 1024 - Status::Ok.head_len());

        let config = Config::default();
        assert_eq!(config.max_read_size, 60 * 1024);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let cli = CliArgs::parse_from(["paladin", "--workers", "0"]);
        let config = Config::merge(cli, TomlConfig::default());
        assert_eq!(config.workers, 1);
    }
}
