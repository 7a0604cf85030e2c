//! In-memory backend
//!
//! Keeps points per measurement and evaluates `SeriesQuery` directly. Used
//! for local runs without a database and as the writer's test double.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::{ChunkStream, SeriesRow, TimeSeriesBackend};
use super::{Point, QueryError, SeriesQuery};
use crate::SinkError;

/// Rows per chunk, matching the InfluxDB chunk size
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

/// In-memory time-series store
#[derive(Debug)]
pub struct MemoryBackend {
    series: RwLock<BTreeMap<String, Vec<Point>>>,
    chunk_size: usize,
    batches_written: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create an empty store returning at most `chunk_size` rows per chunk
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            series: RwLock::new(BTreeMap::new()),
            chunk_size: chunk_size.max(1),
            batches_written: AtomicU64::new(0),
        }
    }

    /// Total points stored across all measurements
    pub fn len(&self) -> usize {
        self.series.read().values().map(Vec::len).sum()
    }

    /// Whether the store holds no points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `write_points` calls that stored at least one point
    pub fn batches_written(&self) -> u64 {
        self.batches_written.load(Ordering::Relaxed)
    }

    /// Copy of the points stored under one measurement
    pub fn points(&self, measurement: &str) -> Vec<Point> {
        self.series
            .read()
            .get(measurement)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TimeSeriesBackend for MemoryBackend {
    async fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
        if points.is_empty() {
            return Ok(());
        }

        let mut series = self.series.write();
        for point in points {
            series
                .entry(point.measurement.clone())
                .or_default()
                .push(point.clone());
        }
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn query(&self, query: &SeriesQuery) -> Result<Box<dyn ChunkStream>, QueryError> {
        let mut matched: Vec<(i64, SeriesRow)> = {
            let series = self.series.read();
            series
                .get(&query.measurement)
                .map(|points| {
                    points
                        .iter()
                        .filter(|p| {
                            let ns = p.timestamp_nanos();
                            query.time.is_none_or(|bound| bound.contains(ns))
                                && query.hostname.as_deref().is_none_or(|h| p.hostname == h)
                        })
                        .map(|p| {
                            let ns = p.timestamp_nanos();
                            let row = SeriesRow {
                                time_ns: ns,
                                severity: p.severity.to_string(),
                                message: p.message.clone(),
                            };
                            (ns, row)
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        // Stable, so points sharing a timestamp keep insertion order
        matched.sort_by_key(|(ns, _)| *ns);

        let mut chunks = VecDeque::new();
        let mut rows = matched.into_iter().map(|(_, row)| row).peekable();
        while rows.peek().is_some() {
            chunks.push_back(rows.by_ref().take(self.chunk_size).collect());
        }

        Ok(Box::new(MemoryChunks { chunks }))
    }

    async fn measurements(&self) -> Result<Vec<String>, QueryError> {
        Ok(self
            .series
            .read()
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Pre-computed chunks of one query
struct MemoryChunks {
    chunks: VecDeque<Vec<SeriesRow>>,
}

#[async_trait]
impl ChunkStream for MemoryChunks {
    async fn next_chunk(&mut self) -> Result<Option<Vec<SeriesRow>>, QueryError> {
        Ok(self.chunks.pop_front())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
