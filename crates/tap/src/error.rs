//! Error types for the tap crate

use std::io;
use thiserror::Error;

/// Errors that can occur in the tap system
#[derive(Error, Debug)]
pub enum TapError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Tail listener could not bind
    #[error("failed to bind tail server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Hub is not running (stopped, or its mailbox is gone)
    #[error("broadcast hub not running")]
    HubStopped,
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
