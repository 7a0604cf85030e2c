//! RFC 3164 parser
//!
//! BSD syslog is loosely specified and senders vary a lot, so this parser is
//! lenient: the timestamp and the tag are optional, and anything that does
//! not look like a tag is treated as message body.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{next_token, split_pri};
use crate::{LogMessage, ParseError, SyslogFormat};

/// Length of `Mmm dd hh:mm:ss`
const TIMESTAMP_LEN: usize = 15;

/// Any leap year works for validating a year-less stamp
const LEAP_YEAR: i32 = 2000;

/// Longest TAG accepted (RFC 3164 section 4.1.3 says 32)
const MAX_TAG_LEN: usize = 32;

/// Parse an RFC 3164 message
///
/// The embedded timestamp has no year or zone and is only used to locate
/// the hostname; the message is always stamped with `received_at`.
pub fn parse_rfc3164(text: &str, received_at: DateTime<Utc>) -> Result<LogMessage, ParseError> {
    let (facility, severity, mut rest) = split_pri(text)?;

    let mut hostname = "";
    if has_timestamp(rest) {
        rest = rest[TIMESTAMP_LEN..].trim_start_matches(' ');
        hostname = next_token(&mut rest).ok_or(ParseError::missing("hostname"))?;
    }

    let (binary_name, message) = split_tag(rest);

    Ok(LogMessage {
        timestamp: received_at,
        hostname: hostname.to_string(),
        severity,
        facility,
        binary_name: binary_name.to_string(),
        message: message.to_string(),
        format: SyslogFormat::Rfc3164,
    })
}

/// Whether `rest` starts with a `Mmm dd hh:mm:ss` timestamp
///
/// The stamp carries no year, so it is checked against a leap year to
/// accept `Feb 29` whatever year the message arrived in.
fn has_timestamp(rest: &str) -> bool {
    let Some(candidate) = rest.get(..TIMESTAMP_LEN) else {
        return false;
    };
    let with_year = format!("{LEAP_YEAR} {candidate}");
    NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S").is_ok()
}

/// Split `TAG[PID]: MSG` into (tag, msg)
///
/// Returns an empty tag when the front of `rest` is not tag-shaped.
fn split_tag(rest: &str) -> (&str, &str) {
    let tag_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/'))
        .count();

    if tag_len == 0 || tag_len > MAX_TAG_LEN {
        return ("", rest);
    }

    let tag = &rest[..tag_len];
    let mut after = &rest[tag_len..];

    if after.starts_with('[') {
        match after.find(']') {
            Some(close) => after = &after[close + 1..],
            None => return ("", rest),
        }
    } else if !after.starts_with(':') {
        return ("", rest);
    }

    let body = after.strip_prefix(':').unwrap_or(after);
    (tag, body.strip_prefix(' ').unwrap_or(body))
}

#[cfg(test)]
#[path = "rfc3164_test.rs"]
mod rfc3164_test;
