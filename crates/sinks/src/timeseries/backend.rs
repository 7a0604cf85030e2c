//! Backing store trait
//!
//! Implemented by the InfluxDB HTTP backend and the in-memory backend.

use async_trait::async_trait;

use super::{Point, QueryError, SeriesQuery};
use crate::SinkError;

/// One row of a historical query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRow {
    /// Nanoseconds since the epoch
    pub time_ns: i64,
    pub severity: String,
    pub message: String,
}

/// Forward-only stream of result chunks
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk of rows, `None` once the backend has no more
    async fn next_chunk(&mut self) -> Result<Option<Vec<SeriesRow>>, QueryError>;
}

/// Time-series backend
#[async_trait]
pub trait TimeSeriesBackend: Send + Sync {
    /// Submit points as one batch, in order
    async fn write_points(&self, points: &[Point]) -> Result<(), SinkError>;

    /// Start a chunked query
    async fn query(&self, query: &SeriesQuery) -> Result<Box<dyn ChunkStream>, QueryError>;

    /// Names of all measurements (application names) in the store
    async fn measurements(&self) -> Result<Vec<String>, QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
