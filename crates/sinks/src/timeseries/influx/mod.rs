//! InfluxDB 1.x backend
//!
//! Talks to the InfluxDB HTTP API directly:
//!
//! - writes go to `POST /write?db=..&precision=ns` as line protocol
//! - queries go to `GET /query?..&epoch=ns&chunked=true&chunk_size=..` and
//!   the response is consumed lazily as newline-delimited JSON documents,
//!   one per chunk

mod line_protocol;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use serde::Deserialize;
use serde_json::Value;

use super::backend::{ChunkStream, SeriesRow, TimeSeriesBackend};
use super::{Point, QueryError, SeriesQuery};
use crate::SinkError;

pub use line_protocol::encode_points;

// =============================================================================
// Constants
// =============================================================================

/// Rows per chunk requested from the server
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for an InfluxDB 1.x server
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL (e.g., "http://localhost:8086")
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for basic auth (optional)
    pub username: Option<String>,

    /// Password for basic auth (optional)
    pub password: Option<String>,

    /// Accept any server certificate
    pub insecure_skip_verify: bool,

    /// Connect timeout, and total timeout for writes
    pub timeout: Duration,

    /// Rows per query chunk
    pub chunk_size: usize,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".into(),
            database: "lumber".into(),
            username: None,
            password: None,
            insecure_skip_verify: false,
            timeout: DEFAULT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl InfluxConfig {
    /// Set the server URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set basic auth credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }
}

// =============================================================================
// Backend
// =============================================================================

/// InfluxDB HTTP backend
pub struct InfluxBackend {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl std::fmt::Debug for InfluxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl InfluxBackend {
    /// Create a backend from config
    pub fn new(config: InfluxConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| SinkError::init(format!("building HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get reference to config
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_ref()),
            None => request,
        }
    }

    /// Run a statement and return the chunked response stream
    async fn run_query(&self, statement: &str) -> Result<InfluxChunks, QueryError> {
        let chunk_size = self.config.chunk_size.to_string();
        let request = self.client.get(self.config.endpoint("query")).query(&[
            ("db", self.config.database.as_str()),
            ("q", statement),
            ("epoch", "ns"),
            ("chunked", "true"),
            ("chunk_size", chunk_size.as_str()),
        ]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| QueryError::Connection(format!("InfluxDB connection failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Backend { status, body });
        }

        Ok(InfluxChunks {
            response,
            buf: BytesMut::new(),
            finished: false,
        })
    }
}

#[async_trait]
impl TimeSeriesBackend for InfluxBackend {
    async fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
        if points.is_empty() {
            return Ok(());
        }

        let body = encode_points(points);
        let request = self
            .client
            .post(self.config.endpoint("write"))
            .query(&[("db", self.config.database.as_str()), ("precision", "ns")])
            .timeout(self.config.timeout)
            .body(body);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SinkError::Connection(format!("InfluxDB connection failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Backend { status, body });
        }

        tracing::debug!(points = points.len(), "wrote points to InfluxDB");
        Ok(())
    }

    async fn query(&self, query: &SeriesQuery) -> Result<Box<dyn ChunkStream>, QueryError> {
        let statement = query.to_string();
        tracing::debug!(query = %statement, "executing InfluxDB query");
        let chunks = self.run_query(&statement).await?;
        Ok(Box::new(RowChunks(chunks)))
    }

    async fn measurements(&self) -> Result<Vec<String>, QueryError> {
        let mut chunks = self.run_query("SHOW MEASUREMENTS").await?;
        let mut names = Vec::new();
        while let Some(values) = chunks.next_values().await? {
            names.extend(
                values
                    .into_iter()
                    .filter_map(|row| row.into_iter().next())
                    .filter_map(|name| match name {
                        Value::String(s) => Some(s),
                        _ => None,
                    }),
            );
        }
        Ok(names)
    }

    fn name(&self) -> &'static str {
        "influxdb"
    }
}

// =============================================================================
// Chunked response decoding
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Decode one JSON chunk into its raw value rows
pub(crate) fn decode_chunk(line: &[u8]) -> Result<Vec<Vec<Value>>, QueryError> {
    let chunk: ChunkResponse =
        serde_json::from_slice(line).map_err(|e| QueryError::decode(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(QueryError::execution(error));
    }

    let mut rows = Vec::new();
    for result in chunk.results {
        if let Some(error) = result.error {
            return Err(QueryError::execution(error));
        }
        for series in result.series {
            rows.extend(series.values);
        }
    }
    Ok(rows)
}

/// Map a `[time, severity, message]` value row
pub(crate) fn to_series_row(values: Vec<Value>) -> SeriesRow {
    let mut values = values.into_iter();
    let time_ns = values.next().and_then(|v| v.as_i64()).unwrap_or(0);
    let mut text = || match values.next() {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    let severity = text();
    let message = text();
    SeriesRow {
        time_ns,
        severity,
        message,
    }
}

/// Streaming body split into newline-delimited JSON documents
struct InfluxChunks {
    response: reqwest::Response,
    buf: BytesMut,
    finished: bool,
}

impl InfluxChunks {
    async fn next_values(&mut self) -> Result<Option<Vec<Vec<Value>>>, QueryError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line = self.buf.split_to(pos + 1);
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return decode_chunk(&line).map(Some);
            }

            if self.finished {
                if self.buf.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                let line = self.buf.split();
                return decode_chunk(&line).map(Some);
            }

            match self.response.chunk().await {
                Ok(Some(bytes)) => self.buf.extend_from_slice(&bytes),
                Ok(None) => self.finished = true,
                Err(e) => {
                    return Err(QueryError::Connection(format!("reading results: {}", e)));
                }
            }
        }
    }
}

/// Adapts raw value rows into `SeriesRow`s
struct RowChunks(InfluxChunks);

#[async_trait]
impl ChunkStream for RowChunks {
    async fn next_chunk(&mut self) -> Result<Option<Vec<SeriesRow>>, QueryError> {
        Ok(self
            .0
            .next_values()
            .await?
            .map(|rows| rows.into_iter().map(to_series_row).collect()))
    }
}
