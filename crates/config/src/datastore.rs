//! Datastore configuration
//!
//! Selects the time-series backend and tunes the batched writer.

use std::time::Duration;

use serde::Deserialize;

/// Time-series backend
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// InfluxDB 1.x over HTTP (default)
    #[default]
    InfluxDb,
    /// Process memory, lost on exit
    Memory,
}

/// InfluxDB connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    /// Base URL, e.g. "http://localhost:8086"
    pub url: String,

    /// Database name
    pub database: String,

    /// Basic auth user (empty = no auth)
    pub username: String,

    /// Basic auth password
    pub password: String,

    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,

    /// HTTP request timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".into(),
            database: "lumber".into(),
            username: String::new(),
            password: String::new(),
            insecure_skip_verify: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Datastore configuration
///
/// # Example
///
/// ```toml
/// [datastore]
/// backend = "influxdb"
/// write_interval = "1s"
///
/// [datastore.influxdb]
/// url = "https://influx.internal:8086"
/// database = "logs"
/// username = "lumber"
/// password = "secret"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    /// Backend type (influxdb, memory)
    pub backend: Backend,

    /// Periodic flush interval
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub write_interval: Duration,

    /// InfluxDB settings (used when backend = "influxdb")
    pub influxdb: InfluxDbConfig,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::InfluxDb,
            write_interval: Duration::from_secs(1),
            influxdb: InfluxDbConfig::default(),
        }
    }
}
