//! Query error types

use thiserror::Error;

/// Errors from the historical query path
///
/// End-of-results is not an error; readers signal it with `Ok(None)`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query has no application name to read from
    #[error("missing application name")]
    MissingBinaryName,

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// Backend accepted the request but reported a query error
    #[error("query failed: {0}")]
    Execution(String),

    /// Response body could not be decoded
    #[error("decoding results: {0}")]
    Decode(String),
}

impl QueryError {
    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
