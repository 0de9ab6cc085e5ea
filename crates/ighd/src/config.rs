//! Configuration file parsing and structures.
//!
//! ighd uses TOML for declarative configuration: hub connection details,
//! poll cadence, the daemon's own API bind address, and logging.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use tracing_subscriber::filter::LevelFilter;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    pub hub: HubConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

/// Connection details for the IGH Compact hub
#[derive(Debug, Deserialize)]
pub struct HubConfig {
    /// Hostname or IP address of the hub
    pub host: String,

    /// TCP port of the hub's HTTP API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Access token, passed as a query parameter on every request
    pub token: String,
}

/// Poll cadence configuration
#[derive(Debug, Deserialize)]
pub struct PollConfig {
    /// Seconds between poll ticks
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
        }
    }
}

/// Daemon HTTP API configuration
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Address to serve the daemon API on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    20500
}

fn default_scan_interval() -> u64 {
    30
}

fn default_bind() -> String {
    "127.0.0.1:8565".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        let config: Config = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.host.is_empty() {
            return Err(ConfigError::Invalid("hub.host must not be empty".into()));
        }
        if self.poll.scan_interval == 0 {
            return Err(ConfigError::Invalid(
                "poll.scan_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [hub]
            host = "192.168.1.100"
            token = "secret"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.hub.host, "192.168.1.100");
        assert_eq!(config.hub.port, 20500);
        assert_eq!(config.poll.scan_interval, 30);
        assert_eq!(config.api.bind, "127.0.0.1:8565");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [hub]
            host = "hub.local"
            port = 20501
            token = "secret"

            [poll]
            scan_interval = 10

            [api]
            bind = "0.0.0.0:9000"

            [logging]
            level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.hub.port, 20501);
        assert_eq!(config.poll.scan_interval, 10);
        assert_eq!(config.api.bind, "0.0.0.0:9000");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_zero_scan_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ighd.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
            [hub]
            host = "hub.local"
            token = "secret"

            [poll]
            scan_interval = 0
            "#
        )
        .unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_error() {
        let err = Config::from_file("/nonexistent/ighd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
        assert!(err.to_string().contains("/nonexistent/ighd.toml"));
    }

    #[test]
    fn test_missing_token_is_parse_error() {
        let toml = r#"
            [hub]
            host = "hub.local"
        "#;

        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
