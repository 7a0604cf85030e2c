//! Parse error types
//!
//! Errors raised while turning a raw syslog frame into a `LogMessage`.

use thiserror::Error;

/// Errors that can occur while parsing syslog messages
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Frame contained no bytes
    #[error("empty message")]
    Empty,

    /// PRI header missing or unterminated
    #[error("missing or malformed PRI header")]
    InvalidPri,

    /// PRI value outside 0..=191
    #[error("PRI value {0} out of range")]
    PriOutOfRange(u16),

    /// Unsupported RFC 5424 version
    #[error("unsupported syslog version: {0}")]
    UnsupportedVersion(String),

    /// Timestamp could not be parsed
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Header ended before a required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Structured data element is malformed
    #[error("malformed structured data")]
    InvalidStructuredData,

    /// Severity name not recognised
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}

impl ParseError {
    /// Create a missing field error
    #[inline]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(ParseError::PriOutOfRange(200).to_string().contains("200"));
        assert!(
            ParseError::missing("hostname")
                .to_string()
                .contains("hostname")
        );
        assert!(
            ParseError::UnsupportedVersion("2".into())
                .to_string()
                .contains("version")
        );
    }
}
