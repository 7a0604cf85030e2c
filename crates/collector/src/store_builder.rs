//! Time-series store construction from config
//!
//! Shared by `serve` (write path) and `query`/`list` (read path) so both
//! talk to the same backend the same way.

use std::sync::Arc;

use anyhow::{Context, Result};
use lumber_config::{Backend, DatastoreConfig, InfluxDbConfig};
use lumber_sinks::timeseries::TimeSeriesBackend;
use lumber_sinks::timeseries::influx::{InfluxBackend, InfluxConfig};
use lumber_sinks::timeseries::memory::MemoryBackend;
use lumber_sinks::{TimeSeriesWriter, WriterConfig};
use tokio_util::sync::CancellationToken;

/// Build the configured backend and wrap it in a batched writer
///
/// The writer is returned unstarted. Reads work without starting it.
pub fn build_store(config: &DatastoreConfig, cancel: &CancellationToken) -> Result<TimeSeriesWriter> {
    let backend = build_backend(config)?;
    let writer_config = WriterConfig::default().with_write_interval(config.write_interval);
    Ok(TimeSeriesWriter::new(backend, writer_config, cancel))
}

fn build_backend(config: &DatastoreConfig) -> Result<Arc<dyn TimeSeriesBackend>> {
    match config.backend {
        Backend::InfluxDb => {
            let backend = InfluxBackend::new(influx_config(&config.influxdb))
                .context("failed to create InfluxDB backend")?;
            Ok(Arc::new(backend))
        }
        Backend::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}

fn influx_config(config: &InfluxDbConfig) -> InfluxConfig {
    let mut influx = InfluxConfig::default()
        .with_url(&config.url)
        .with_database(&config.database);

    if !config.username.is_empty() {
        influx = influx.with_credentials(&config.username, &config.password);
    }
    influx.insecure_skip_verify = config.insecure_skip_verify;
    influx.timeout = config.timeout;
    influx
}
