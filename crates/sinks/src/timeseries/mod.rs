//! Time-series store
//!
//! The batched writer (`TimeSeriesWriter`), the historical query path
//! (`Reader`), and the backends they run on.
//!
//! # Backends
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | `influx` | InfluxDB 1.x over HTTP |
//! | `memory` | In-process store for local runs and tests |

mod backend;
mod error;
mod metrics;
mod point;
mod query;
mod reader;
mod writer;

pub mod influx;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lumber_protocol::QueryParams;

use crate::{Sink, SinkError};

pub use backend::{ChunkStream, SeriesRow, TimeSeriesBackend};
pub use error::QueryError;
pub use metrics::{WriterMetrics, WriterMetricsSnapshot};
pub use point::Point;
pub use query::{SeriesQuery, TimeBound};
pub use reader::QueryReader;
pub use writer::{
    DEFAULT_WRITE_INTERVAL, FLUSH_TIMEOUT, HIGH_WATER_MARK, TimeSeriesWriter, WriterConfig,
};

/// Sink that also serves historical reads
#[async_trait]
pub trait TimeSeriesStore: Sink {
    /// Retention hook. No retention policy is defined, so this does nothing.
    async fn rotate(&self, older_than: DateTime<Utc>) -> Result<(), SinkError>;

    /// Fresh reader for one query
    fn result_reader(&self, params: QueryParams) -> Box<dyn Reader>;

    /// Application names known to the store
    async fn list(&self) -> Result<Vec<String>, QueryError>;
}

/// Forward-only sequence of result chunks
#[async_trait]
pub trait Reader: Send {
    /// Next chunk of newline-terminated lines
    ///
    /// Returns `Ok(None)` once the results are exhausted, and on every call
    /// after that.
    async fn read_next(&mut self) -> Result<Option<Bytes>, QueryError>;
}
