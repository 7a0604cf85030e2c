//! Structured backend query
//!
//! `SeriesQuery` is the backend-neutral form of a `QueryParams` read. Its
//! `Display` renders the InfluxQL statement:
//!
//! ```text
//! select time,severity,message from <app> [where <time bound> [and hostname='<host>']]
//! ```
//!
//! Only one time bound is ever applied: the start bound when present,
//! otherwise the end bound.

use std::fmt;

use lumber_protocol::QueryParams;

use super::QueryError;
use super::point::to_nanos;

/// Which side of the time range constrains the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    /// `time >= ns`
    From(i64),
    /// `time <= ns`
    Until(i64),
}

impl TimeBound {
    /// Whether a point at `ns` satisfies the bound
    #[inline]
    pub fn contains(self, ns: i64) -> bool {
        match self {
            Self::From(start) => ns >= start,
            Self::Until(end) => ns <= end,
        }
    }
}

/// Backend-neutral read of one measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    pub measurement: String,
    pub time: Option<TimeBound>,
    pub hostname: Option<String>,
}

impl SeriesQuery {
    /// Build from user-facing params, rejecting a missing application name
    pub fn from_params(params: &QueryParams) -> Result<Self, QueryError> {
        if params.binary_name.is_empty() {
            return Err(QueryError::MissingBinaryName);
        }

        let time = match (params.start_date, params.end_date) {
            (Some(start), _) => Some(TimeBound::From(to_nanos(start))),
            (None, Some(end)) => Some(TimeBound::Until(to_nanos(end))),
            (None, None) => None,
        };

        Ok(Self {
            measurement: params.binary_name.clone(),
            time,
            hostname: params.hostname_filter().map(str::to_string),
        })
    }
}

impl fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select time,severity,message from ")?;
        write_identifier(f, &self.measurement)?;

        let mut sep = " where ";
        if let Some(bound) = self.time {
            f.write_str(sep)?;
            match bound {
                TimeBound::From(ns) => write!(f, "time >= {}", ns)?,
                TimeBound::Until(ns) => write!(f, "time <= {}", ns)?,
            }
            sep = " and ";
        }
        if let Some(host) = &self.hostname {
            f.write_str(sep)?;
            f.write_str("hostname='")?;
            for c in host.chars() {
                if matches!(c, '\'' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("'")?;
        }
        Ok(())
    }
}

/// Write an identifier, double-quoting it unless it is a plain word
fn write_identifier(f: &mut fmt::Formatter<'_>, ident: &str) -> fmt::Result {
    let plain = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        return f.write_str(ident);
    }

    f.write_str("\"")?;
    for c in ident.chars() {
        if matches!(c, '"' | '\\') {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_plain_query() {
        let q = SeriesQuery::from_params(&QueryParams::new("nginx")).unwrap();
        assert_eq!(q.to_string(), "select time,severity,message from nginx");
    }

    #[test]
    fn test_missing_binary_name() {
        let err = SeriesQuery::from_params(&QueryParams::default()).unwrap_err();
        assert!(matches!(err, QueryError::MissingBinaryName));
        assert_eq!(err.to_string(), "missing application name");
    }

    #[test]
    fn test_start_wins_over_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let params = QueryParams::new("app")
            .with_start(start)
            .with_end(end)
            .with_hostname("h1");
        let q = SeriesQuery::from_params(&params).unwrap();

        assert_eq!(q.time, Some(TimeBound::From(1_704_067_200_000_000_000)));
        assert_eq!(
            q.to_string(),
            "select time,severity,message from app where time >= 1704067200000000000 and hostname='h1'"
        );
    }

    #[test]
    fn test_end_only() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let q = SeriesQuery::from_params(&QueryParams::new("app").with_end(end)).unwrap();
        assert_eq!(
            q.to_string(),
            "select time,severity,message from app where time <= 1704067200000000000"
        );
    }

    #[test]
    fn test_hostname_only_and_escaping() {
        let q = SeriesQuery::from_params(&QueryParams::new("my-app").with_hostname("o'neil")).unwrap();
        assert_eq!(
            q.to_string(),
            r#"select time,severity,message from "my-app" where hostname='o\'neil'"#
        );
    }

    #[test]
    fn test_time_bound_contains() {
        assert!(TimeBound::From(10).contains(10));
        assert!(!TimeBound::From(10).contains(9));
        assert!(TimeBound::Until(10).contains(10));
        assert!(!TimeBound::Until(10).contains(11));
    }
}
