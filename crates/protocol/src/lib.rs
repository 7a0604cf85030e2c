//! Lumber Protocol - Core types for the lumber log collector
//!
//! This crate provides the types that flow through the pipeline:
//! - `LogMessage` - One structured syslog record
//! - `Severity` / `Facility` - Bounded syslog enumerations
//! - `SyslogFormat` - Which dialect produced a message
//! - `QueryParams` - Filter for historical reads
//!
//! and the syslog parsers in [`syslog`].

mod error;
mod message;
mod query;
pub mod syslog;

pub use error::ParseError;
pub use message::{Facility, LogMessage, Severity, SyslogFormat};
pub use query::QueryParams;
pub use syslog::ParseMode;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ParseError>;
