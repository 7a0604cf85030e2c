//! Historical query filter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Severity;

/// Read filter for historical log lines
///
/// `binary_name` is required; every other field narrows the result set
/// when present. `None` on either date means no bound on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Application name (measurement) to read from
    pub binary_name: String,

    /// Equality filter on the originating host
    pub hostname: Option<String>,

    /// Inclusive lower time bound
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive upper time bound
    pub end_date: Option<DateTime<Utc>>,

    /// Accepted but not applied by any backend yet
    pub severity: Option<Severity>,
}

impl QueryParams {
    /// Create params for one application
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            ..Default::default()
        }
    }

    /// Restrict results to a single host
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the lower time bound
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Set the upper time bound
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Hostname filter, ignoring empty strings
    #[inline]
    pub fn hostname_filter(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|h| !h.is_empty())
    }
}
