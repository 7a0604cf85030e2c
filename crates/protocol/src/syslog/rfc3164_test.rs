//! Tests for the RFC 3164 parser

use chrono::{TimeZone, Utc};

use super::*;
use crate::{Facility, Severity};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_parse_standard_message() {
    let msg = parse_rfc3164("<134>Dec 20 12:34:56 router1 sshd[411]: Accepted publickey", now())
        .unwrap();

    assert_eq!(msg.facility, Facility::Local0);
    assert_eq!(msg.severity, Severity::Info);
    assert_eq!(msg.hostname, "router1");
    assert_eq!(msg.binary_name, "sshd");
    assert_eq!(msg.message, "Accepted publickey");
    assert_eq!(msg.format, SyslogFormat::Rfc3164);
}

#[test]
fn test_embedded_timestamp_is_ignored() {
    let msg = parse_rfc3164("<13>Jan 11 00:00:00 host app: hi", now()).unwrap();
    assert_eq!(msg.timestamp, now());
}

#[test]
fn test_leap_day_in_non_leap_year() {
    let received = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let msg = parse_rfc3164("<13>Feb 29 10:00:00 host1 app: leap day", received).unwrap();

    assert_eq!(msg.hostname, "host1");
    assert_eq!(msg.binary_name, "app");
    assert_eq!(msg.message, "leap day");
    assert_eq!(msg.timestamp, received);
}

#[test]
fn test_impossible_date_is_not_a_timestamp() {
    let msg = parse_rfc3164("<13>Feb 30 10:00:00 host1 app: x", now()).unwrap();
    assert_eq!(msg.hostname, "");
}

#[test]
fn test_tag_without_pid() {
    let msg = parse_rfc3164("<13>Oct 11 22:14:15 mymachine su: 'su root' failed", now()).unwrap();
    assert_eq!(msg.binary_name, "su");
    assert_eq!(msg.message, "'su root' failed");
}

#[test]
fn test_no_timestamp_no_hostname() {
    let msg = parse_rfc3164("<13>myapp: local message", now()).unwrap();
    assert_eq!(msg.hostname, "");
    assert_eq!(msg.binary_name, "myapp");
    assert_eq!(msg.message, "local message");
}

#[test]
fn test_body_without_tag() {
    let msg = parse_rfc3164("<13>Oct 11 22:14:15 host %LINK-3-UPDOWN changed", now()).unwrap();
    assert_eq!(msg.hostname, "host");
    assert_eq!(msg.binary_name, "");
    assert_eq!(msg.message, "%LINK-3-UPDOWN changed");
}

#[test]
fn test_invalid_pri() {
    assert_eq!(
        parse_rfc3164("134>Dec 20 12:34:56 host app: x", now()).unwrap_err(),
        ParseError::InvalidPri
    );
    assert_eq!(
        parse_rfc3164("<999>Dec 20 12:34:56 host app: x", now()).unwrap_err(),
        ParseError::PriOutOfRange(999)
    );
    assert_eq!(
        parse_rfc3164("<13 Dec 20 12:34:56 host app: x", now()).unwrap_err(),
        ParseError::InvalidPri
    );
}
