//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error - two listeners share an address
    #[error("address {address} is used by both {first} and {second}")]
    DuplicateAddress {
        address: String,
        first: &'static str,
        second: &'static str,
    },

    /// Validation error - required field missing
    #[error("{section} is missing required field '{field}'")]
    MissingField {
        /// Config section (e.g., "datastore.influxdb")
        section: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{section} has invalid {field}: {message}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    /// No syslog listener enabled
    #[error("no syslog listeners are enabled - enable syslog.tcp or syslog.udp")]
    NoListenersEnabled,
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("datastore.influxdb", "url");
        assert!(err.to_string().contains("datastore.influxdb"));
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("syslog", "max_message_size", "must be greater than 0");
        assert!(err.to_string().contains("syslog"));
        assert!(err.to_string().contains("max_message_size"));
    }

    #[test]
    fn test_duplicate_address_error() {
        let err = ConfigError::DuplicateAddress {
            address: "0.0.0.0:514".into(),
            first: "syslog.tcp",
            second: "tail",
        };
        assert!(err.to_string().contains("0.0.0.0:514"));
        assert!(err.to_string().contains("tail"));
    }

    #[test]
    fn test_no_listeners_enabled() {
        let err = ConfigError::NoListenersEnabled;
        assert!(err.to_string().contains("no syslog listeners"));
    }
}
