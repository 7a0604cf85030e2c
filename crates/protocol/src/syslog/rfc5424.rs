//! RFC 5424 parser

use chrono::{DateTime, Utc};

use super::{next_token, split_pri};
use crate::{LogMessage, ParseError, SyslogFormat};

/// RFC 5424 NILVALUE
const NIL: &str = "-";

/// UTF-8 byte order mark allowed in front of MSG
const BOM: char = '\u{feff}';

/// Parse an RFC 5424 message
///
/// Nil header fields become empty strings. A nil timestamp falls back to
/// `received_at`. Structured data is validated and skipped.
pub fn parse_rfc5424(text: &str, received_at: DateTime<Utc>) -> Result<LogMessage, ParseError> {
    let (facility, severity, mut rest) = split_pri(text)?;

    let version = next_token(&mut rest).ok_or(ParseError::missing("version"))?;
    if version != "1" {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let timestamp = next_token(&mut rest).ok_or(ParseError::missing("timestamp"))?;
    let timestamp = if timestamp == NIL {
        received_at
    } else {
        DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| ParseError::InvalidTimestamp(timestamp.to_string()))?
            .with_timezone(&Utc)
    };

    let hostname = next_token(&mut rest).ok_or(ParseError::missing("hostname"))?;
    let app_name = next_token(&mut rest).ok_or(ParseError::missing("app-name"))?;
    let _proc_id = next_token(&mut rest).ok_or(ParseError::missing("procid"))?;
    let _msg_id = next_token(&mut rest).ok_or(ParseError::missing("msgid"))?;

    let message = skip_structured_data(rest)?;
    let message = message.strip_prefix(BOM).unwrap_or(message);

    Ok(LogMessage {
        timestamp,
        hostname: nil_to_empty(hostname),
        severity,
        facility,
        binary_name: nil_to_empty(app_name),
        message: message.to_string(),
        format: SyslogFormat::Rfc5424,
    })
}

#[inline]
fn nil_to_empty(field: &str) -> String {
    if field == NIL {
        String::new()
    } else {
        field.to_string()
    }
}

/// Consume STRUCTURED-DATA and return whatever follows it (the MSG)
fn skip_structured_data(rest: &str) -> Result<&str, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::missing("structured-data"));
    }

    if let Some(msg) = rest.strip_prefix(NIL) {
        return match msg.as_bytes().first() {
            None => Ok(""),
            Some(b' ') => Ok(&msg[1..]),
            Some(_) => Err(ParseError::InvalidStructuredData),
        };
    }

    let bytes = rest.as_bytes();
    let mut pos = 0;

    while bytes.get(pos) == Some(&b'[') {
        pos += 1;
        let mut in_quotes = false;
        let mut escaped = false;
        loop {
            let Some(&b) = bytes.get(pos) else {
                return Err(ParseError::InvalidStructuredData);
            };
            pos += 1;
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' if in_quotes => escaped = true,
                b'"' => in_quotes = !in_quotes,
                b']' if !in_quotes => break,
                _ => {}
            }
        }
    }

    if pos == 0 {
        return Err(ParseError::InvalidStructuredData);
    }

    match bytes.get(pos) {
        None => Ok(""),
        Some(b' ') => Ok(&rest[pos + 1..]),
        Some(_) => Err(ParseError::InvalidStructuredData),
    }
}

#[cfg(test)]
#[path = "rfc5424_test.rs"]
mod rfc5424_test;
