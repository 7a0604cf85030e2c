//! Lumber Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use lumber_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[syslog]\nlog_to_stdout = true").unwrap();
//! assert!(config.syslog.log_to_stdout);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [syslog]
//! format = "automatic"
//!
//! [syslog.tcp]
//! port = 5514
//!
//! [syslog.udp]
//! port = 5514
//!
//! [datastore]
//! backend = "influxdb"
//! write_interval = "1s"
//!
//! [datastore.influxdb]
//! url = "http://localhost:8086"
//! database = "lumber"
//!
//! [tail]
//! address = "127.0.0.1:5515"
//! ```

mod datastore;
mod error;
mod logging;
mod syslog;
mod tail;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use datastore::{Backend, DatastoreConfig, InfluxDbConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use syslog::{ListenerConfig, SyslogConfig};
pub use tail::TailConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Syslog listeners
    pub syslog: SyslogConfig,

    /// Time-series store
    pub datastore: DatastoreConfig,

    /// Live tail server
    pub tail: TailConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Names of the enabled syslog listeners
    pub fn enabled_listeners(&self) -> Vec<&'static str> {
        let mut listeners = Vec::new();
        if self.syslog.tcp.enabled {
            listeners.push("tcp");
        }
        if self.syslog.udp.enabled {
            listeners.push("udp");
        }
        listeners
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.enabled_listeners(), vec!["tcp", "udp"]);
        assert_eq!(config.datastore.backend, Backend::InfluxDb);
        assert!(config.tail.enabled);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[syslog]
format = "rfc3164"
max_message_size = 4096
log_to_stdout = true

[syslog.tcp]
address = "127.0.0.1"
port = 5514

[syslog.udp]
enabled = false

[datastore]
backend = "memory"
write_interval = "2s"

[tail]
address = "127.0.0.1:6000"
subscriber_buffer = 64
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.syslog.format, lumber_protocol::ParseMode::Rfc3164);
        assert_eq!(config.syslog.max_message_size, 4096);
        assert_eq!(config.enabled_listeners(), vec!["tcp"]);
        assert_eq!(config.datastore.write_interval, Duration::from_secs(2));
        assert_eq!(config.tail.subscriber_buffer, 64);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/lumber.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("/nonexistent/lumber.toml"));
    }
}
