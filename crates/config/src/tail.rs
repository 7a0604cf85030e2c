//! Live tail server configuration

use serde::Deserialize;

/// Tail server configuration
///
/// # Example
///
/// ```toml
/// [tail]
/// address = "0.0.0.0:5515"
/// subscriber_buffer = 1024
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Whether the tail server runs
    /// Default: true
    pub enabled: bool,

    /// Listen address
    /// Default: "127.0.0.1:5515"
    pub address: String,

    /// Messages buffered per client before it is dropped as slow
    /// Default: 256
    pub subscriber_buffer: usize,

    /// Maximum concurrent clients
    /// Default: 100
    pub max_connections: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1:5515".into(),
            subscriber_buffer: 256,
            max_connections: 100,
        }
    }
}
