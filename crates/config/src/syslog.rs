//! Syslog listener configuration

use std::time::Duration;

use lumber_protocol::ParseMode;
use serde::Deserialize;

/// Default syslog port (privileged - may need root)
const DEFAULT_PORT: u16 = 514;

/// One listening endpoint
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Whether this endpoint is enabled
    /// Default: true
    pub enabled: bool,

    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 514
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
        }
    }
}

impl ListenerConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Syslog listener configuration
///
/// # Example
///
/// ```toml
/// [syslog]
/// format = "automatic"
/// log_to_stdout = true
///
/// [syslog.tcp]
/// port = 5514
///
/// [syslog.udp]
/// enabled = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyslogConfig {
    /// TCP listener
    pub tcp: ListenerConfig,

    /// UDP listener
    pub udp: ListenerConfig,

    /// Dialect the listeners accept (automatic, rfc3164, rfc5424)
    pub format: ParseMode,

    /// Maximum syslog message size in bytes
    /// Default: 8192
    pub max_message_size: usize,

    /// Echo every message to stdout through the console sink
    /// Default: false
    pub log_to_stdout: bool,

    /// Colour console output
    /// Default: true
    pub color: bool,

    /// Idle TCP connection timeout (0s = never)
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            tcp: ListenerConfig::default(),
            udp: ListenerConfig::default(),
            format: ParseMode::Automatic,
            max_message_size: 8192,
            log_to_stdout: false,
            color: true,
            connection_timeout: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyslogConfig::default();
        assert!(config.tcp.enabled);
        assert!(config.udp.enabled);
        assert_eq!(config.tcp.bind_address(), "0.0.0.0:514");
        assert_eq!(config.format, ParseMode::Automatic);
        assert_eq!(config.max_message_size, 8192);
        assert!(!config.log_to_stdout);
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
format = "rfc5424"
log_to_stdout = true
connection_timeout = "30s"

[tcp]
address = "127.0.0.1"
port = 5514

[udp]
enabled = false
"#;
        let config: SyslogConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.format, ParseMode::Rfc5424);
        assert!(config.log_to_stdout);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.tcp.bind_address(), "127.0.0.1:5514");
        assert!(!config.udp.enabled);
        // Unset fields keep their defaults
        assert_eq!(config.udp.port, 514);
    }

    #[test]
    fn test_format_aliases() {
        for (s, expected) in [
            ("auto", ParseMode::Automatic),
            ("automatic", ParseMode::Automatic),
            ("rfc3164", ParseMode::Rfc3164),
            ("rfc5424", ParseMode::Rfc5424),
        ] {
            let config: SyslogConfig = toml::from_str(&format!("format = \"{s}\"")).unwrap();
            assert_eq!(config.format, expected);
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(toml::from_str::<SyslogConfig>(r#"format = "rfc9999""#).is_err());
    }
}
