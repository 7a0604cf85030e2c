//! Tests for dialect selection and shared helpers

use chrono::TimeZone;

use super::*;
use crate::SyslogFormat;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_automatic_detects_rfc5424() {
    let msg = parse(
        b"<165>1 2023-12-20T12:36:15Z host app - - - started\n",
        ParseMode::Automatic,
        now(),
    )
    .unwrap();
    assert_eq!(msg.format, SyslogFormat::Rfc5424);
    assert_eq!(msg.message, "started");
}

#[test]
fn test_automatic_falls_back_to_rfc3164() {
    let msg = parse(
        b"<134>Dec 20 12:34:56 host app: hello\r\n",
        ParseMode::Automatic,
        now(),
    )
    .unwrap();
    assert_eq!(msg.format, SyslogFormat::Rfc3164);
    assert_eq!(msg.message, "hello");
}

#[test]
fn test_forced_mode_is_respected() {
    let err = parse(
        b"<134>Dec 20 12:34:56 host app: hello",
        ParseMode::Rfc5424,
        now(),
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedVersion(_)));
}

#[test]
fn test_empty_frame() {
    assert_eq!(
        parse(b"\r\n", ParseMode::Automatic, now()).unwrap_err(),
        ParseError::Empty
    );
}

#[test]
fn test_split_pri() {
    let (facility, severity, rest) = split_pri("<0>rest").unwrap();
    assert_eq!(facility, Facility::Kern);
    assert_eq!(severity, Severity::Emergency);
    assert_eq!(rest, "rest");

    let (facility, severity, _) = split_pri("<191>x").unwrap();
    assert_eq!(facility, Facility::Local7);
    assert_eq!(severity, Severity::Debug);

    assert_eq!(split_pri("<192>x").unwrap_err(), ParseError::PriOutOfRange(192));
    assert_eq!(split_pri("<>x").unwrap_err(), ParseError::InvalidPri);
    assert_eq!(split_pri("<1a>x").unwrap_err(), ParseError::InvalidPri);
}

#[test]
fn test_next_token() {
    let mut rest = "a bb ccc";
    assert_eq!(next_token(&mut rest), Some("a"));
    assert_eq!(next_token(&mut rest), Some("bb"));
    assert_eq!(next_token(&mut rest), Some("ccc"));
    assert_eq!(next_token(&mut rest), None);
}

#[test]
fn test_parse_mode_from_str() {
    assert_eq!("auto".parse::<ParseMode>().unwrap(), ParseMode::Automatic);
    assert_eq!("RFC3164".parse::<ParseMode>().unwrap(), ParseMode::Rfc3164);
    assert!("rfc6587".parse::<ParseMode>().is_err());
}
