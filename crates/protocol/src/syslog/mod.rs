//! Syslog parsing
//!
//! Turns one raw frame into a `LogMessage`. Framing (newlines, octet
//! counting, datagrams) is the listener's job; by the time a frame gets here
//! it holds exactly one message.
//!
//! # Dialects
//!
//! - **RFC 3164** (BSD syslog): `<PRI>Mmm dd hh:mm:ss HOST TAG[PID]: MSG`
//! - **RFC 5424** (IETF syslog): `<PRI>1 TIMESTAMP HOST APP PROCID MSGID SD MSG`
//!
//! `ParseMode::Automatic` picks the dialect per message by looking at the
//! byte after the PRI header.

mod rfc3164;
mod rfc5424;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{Facility, LogMessage, ParseError, Severity};

pub use rfc3164::parse_rfc3164;
pub use rfc5424::parse_rfc5424;

/// Highest valid PRI value (facility 23, severity 7)
const MAX_PRI: u16 = 191;

/// Which dialect(s) a listener accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Detect per message
    #[default]
    #[serde(alias = "auto")]
    Automatic,
    /// Only RFC 3164
    Rfc3164,
    /// Only RFC 5424
    Rfc5424,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(Self::Automatic),
            "rfc3164" => Ok(Self::Rfc3164),
            "rfc5424" => Ok(Self::Rfc5424),
            _ => Err(format!("unknown syslog format: {}", s)),
        }
    }
}

/// Parse one syslog frame
///
/// `received_at` is used whenever the message has no trustworthy
/// timestamp of its own.
pub fn parse(
    frame: &[u8],
    mode: ParseMode,
    received_at: DateTime<Utc>,
) -> Result<LogMessage, ParseError> {
    let text = String::from_utf8_lossy(frame);
    let text = text.trim_end_matches(['\r', '\n', '\0']);
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    match mode {
        ParseMode::Rfc3164 => parse_rfc3164(text, received_at),
        ParseMode::Rfc5424 => parse_rfc5424(text, received_at),
        ParseMode::Automatic => {
            if looks_like_rfc5424(text) {
                parse_rfc5424(text, received_at)
            } else {
                parse_rfc3164(text, received_at)
            }
        }
    }
}

/// `<PRI>` followed by a non-zero version number and a space
fn looks_like_rfc5424(text: &str) -> bool {
    let Some(end) = text.find('>') else {
        return false;
    };
    let after = &text.as_bytes()[end + 1..];
    let digits = after.iter().take_while(|b| b.is_ascii_digit()).count();
    (1..=2).contains(&digits) && after[0] != b'0' && after.get(digits) == Some(&b' ')
}

/// Split `<PRI>` off the front of a message
pub(crate) fn split_pri(text: &str) -> Result<(Facility, Severity, &str), ParseError> {
    let rest = text.strip_prefix('<').ok_or(ParseError::InvalidPri)?;
    let end = rest.find('>').ok_or(ParseError::InvalidPri)?;
    let digits = &rest[..end];
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPri);
    }

    let pri: u16 = digits.parse().map_err(|_| ParseError::InvalidPri)?;
    if pri > MAX_PRI {
        return Err(ParseError::PriOutOfRange(pri));
    }

    // Both lookups are total for pri <= 191
    let facility = Facility::from_u8((pri >> 3) as u8).ok_or(ParseError::PriOutOfRange(pri))?;
    let severity = Severity::from_u8((pri & 0x07) as u8).ok_or(ParseError::PriOutOfRange(pri))?;

    Ok((facility, severity, &rest[end + 1..]))
}

/// Take the next space-delimited token
pub(crate) fn next_token<'a>(rest: &mut &'a str) -> Option<&'a str> {
    if rest.is_empty() {
        return None;
    }
    match rest.find(' ') {
        Some(pos) => {
            let token = &rest[..pos];
            *rest = &rest[pos + 1..];
            Some(token)
        }
        None => {
            let token = *rest;
            *rest = "";
            Some(token)
        }
    }
}

#[cfg(test)]
#[path = "syslog_test.rs"]
mod syslog_test;
