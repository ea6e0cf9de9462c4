//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;
use crate::sources::{builtin_metrics, MetricSettings, DEFAULT_API_URL};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub source: SourceConfig,

    /// Metrics to poll; the built-in block metrics when omitted
    #[serde(default = "builtin_metrics")]
    pub metrics: Vec<MetricSettings>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Metrics service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL substituted for `{api}` in metric endpoints
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport timeout of the HTTP client
    #[serde(default = "default_source_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_source_timeout() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_source_timeout(),
            user_agent: None,
        }
    }
}

impl SourceConfig {
    /// Settings for the HTTP metrics client
    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig {
            request_timeout_ms: self.request_timeout_ms,
            ..ClientConfig::default()
        };
        if let Some(agent) = &self.user_agent {
            client.user_agent = agent.clone();
        }
        client
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Nothing is logged here because this runs before the subscriber is
    /// installed; call [`LoadOutcome::log`] once it is.
    pub fn load_default() -> LoadOutcome {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("icpulse").join("config.toml")),
            Some(PathBuf::from("/etc/icpulse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file in `paths` that parses
    fn load_first(paths: &[PathBuf]) -> LoadOutcome {
        let mut skipped = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return LoadOutcome {
                        config,
                        source: ConfigSource::File(path.clone()),
                        skipped,
                    }
                }
                Err(e) => skipped.push(e),
            }
        }

        LoadOutcome {
            config: Self::from_env(),
            source: ConfigSource::Defaults,
            skipped,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = lookup("ICPULSE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("ICPULSE_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid ICPULSE_API_PORT {:?}", port),
            }
        }

        // Source overrides
        if let Some(url) = lookup("ICPULSE_SOURCE_URL") {
            self.source.base_url = url;
        }

        // Logging overrides
        if let Some(level) = lookup("ICPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ICPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            source: SourceConfig::default(),
            metrics: builtin_metrics(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where a loaded config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Built-in defaults with environment overrides
    Defaults,
}

/// Result of searching the default config locations
#[derive(Debug)]
pub struct LoadOutcome {
    pub config: Config,
    pub source: ConfigSource,
    /// Files that exist but could not be read or parsed
    pub skipped: Vec<ConfigError>,
}

impl LoadOutcome {
    /// Report how the config was found
    pub fn log(&self) {
        for error in &self.skipped {
            tracing::warn!("Skipped config file: {}", error);
        }
        match &self.source {
            ConfigSource::File(path) => tracing::info!("Loaded config from {:?}", path),
            ConfigSource::Defaults => {
                tracing::info!("Using default config with environment overrides")
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# icpulse Configuration
#
# Environment variables override these settings:
# - ICPULSE_API_HOST
# - ICPULSE_API_PORT
# - ICPULSE_SOURCE_URL
# - ICPULSE_LOG_LEVEL
# - ICPULSE_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8082

# Request timeout in seconds
request_timeout_secs = 30

[source]
# Metrics API base URL, substituted for {api} in endpoints
base_url = "https://ic-api.internetcomputer.org"

# HTTP client timeout (ms)
request_timeout_ms = 10000

# Optional User-Agent override
# user_agent = "icpulse"

# Metrics to poll. Leave out every [[metrics]] entry to use the built-ins.
#
# shape: point ([ts, v]), nested_point ([[ts, v]]) or series (latest of [[ts, v], ...])
# monotonic: discard samples that do not increase the value
# request_timeout_ms: defaults to three quarters of interval_ms

[[metrics]]
name = "block_height"
title = "Blocks"
endpoint = "{api}/api/v3/metrics/block-height"
field = "block_height"
shape = "point"
monotonic = true
interval_ms = 4000
error_threshold = 2

# Animate the first value from an estimate based on the live block rate
[metrics.baseline]
type = "rate_from"
endpoint = "{api}/api/v3/metrics/block-rate"
field = "block_rate"
shape = "nested_point"
fallback_per_second = 45.0

[[metrics]]
name = "block_rate"
title = "Block Rate"
endpoint = "{api}/api/v3/metrics/block-rate"
field = "block_rate"
shape = "nested_point"
interval_ms = 10000
error_threshold = 2

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 8082);
        assert_eq!(config.source.base_url, DEFAULT_API_URL);
        assert_eq!(config.metrics, builtin_metrics());
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let file = write_config(&generate_default_config());
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.api.port, 8082);
        assert_eq!(config.source.request_timeout_ms, 10_000);
        assert_eq!(config.metrics, builtin_metrics());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let file = write_config(
            r#"
            [source]
            base_url = "http://localhost:9000"

            [[metrics]]
            name = "subnets"
            endpoint = "{api}/api/v3/metrics/subnets"
            field = "subnets"
            "#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.source.base_url, "http://localhost:9000");
        assert_eq!(config.metrics.len(), 1);
        assert_eq!(config.metrics[0].title(), "subnets");
        assert_eq!(config.metrics[0].interval_ms, 10_000);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/icpulse.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[api\nport = ");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_broken_file_is_reported_and_skipped() {
        let broken = write_config("[api\nport = ");
        let valid = write_config("[api]\nport = 9100\n");
        let missing = PathBuf::from("/nonexistent/icpulse.toml");

        let outcome = Config::load_first(&[
            missing,
            broken.path().to_path_buf(),
            valid.path().to_path_buf(),
        ]);

        assert_eq!(outcome.source, ConfigSource::File(valid.path().to_path_buf()));
        assert_eq!(outcome.config.api.port, 9100);
        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(outcome.skipped[0], ConfigError::Parse { .. }));
    }

    #[test]
    fn test_no_usable_file_falls_back_to_defaults() {
        let broken = write_config("metrics = 3");

        let outcome = Config::load_first(&[broken.path().to_path_buf()]);

        assert_eq!(outcome.source, ConfigSource::Defaults);
        assert_eq!(outcome.config.metrics, builtin_metrics());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ICPULSE_API_HOST", "127.0.0.1"),
            ("ICPULSE_API_PORT", "not-a-port"),
            ("ICPULSE_SOURCE_URL", "http://mirror.test"),
            ("ICPULSE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 8082);
        assert_eq!(config.source.base_url, "http://mirror.test");
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_client_config() {
        let mut source = SourceConfig::default();
        assert!(source.client_config().user_agent.starts_with("icpulse/"));

        source.user_agent = Some("dashboard".to_string());
        source.request_timeout_ms = 2500;
        let client = source.client_config();
        assert_eq!(client.user_agent, "dashboard");
        assert_eq!(client.request_timeout_ms, 2500);
    }
}
