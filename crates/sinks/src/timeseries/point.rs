//! Buffered time-series point

use chrono::{DateTime, Utc};
use lumber_protocol::{Facility, LogMessage, Severity};

/// One stored log line
///
/// Tags are hostname, severity and facility; the single field is the
/// message body; the measurement is the application name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub measurement: String,
    pub hostname: String,
    pub severity: Severity,
    pub facility: Facility,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Build a point from a message received at `received_at`
    pub fn from_message(msg: &LogMessage, received_at: DateTime<Utc>) -> Self {
        Self {
            measurement: msg.binary_name.clone(),
            hostname: msg.hostname.clone(),
            severity: msg.severity,
            facility: msg.facility,
            message: msg.message.clone(),
            timestamp: msg.storage_timestamp(received_at),
        }
    }

    /// Timestamp as nanoseconds since the Unix epoch
    #[inline]
    pub fn timestamp_nanos(&self) -> i64 {
        to_nanos(self.timestamp)
    }
}

/// Nanoseconds since the epoch, saturating outside the representable range
pub fn to_nanos(ts: DateTime<Utc>) -> i64 {
    match ts.timestamp_nanos_opt() {
        Some(ns) => ns,
        None if ts.timestamp() < 0 => i64::MIN,
        None => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lumber_protocol::SyslogFormat;

    fn message(format: SyslogFormat) -> LogMessage {
        LogMessage {
            timestamp: Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap(),
            hostname: "web1".into(),
            severity: Severity::Warning,
            facility: Facility::Local3,
            binary_name: "nginx".into(),
            message: "slow upstream".into(),
            format,
        }
    }

    #[test]
    fn test_legacy_points_use_receipt_time() {
        let received = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let point = Point::from_message(&message(SyslogFormat::Rfc3164), received);

        assert_eq!(point.timestamp, received);
        assert_eq!(point.measurement, "nginx");
        assert_eq!(point.hostname, "web1");
        assert_eq!(point.severity, Severity::Warning);
        assert_eq!(point.facility, Facility::Local3);
    }

    #[test]
    fn test_rfc5424_points_keep_message_time() {
        let received = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let msg = message(SyslogFormat::Rfc5424);
        let point = Point::from_message(&msg, received);
        assert_eq!(point.timestamp, msg.timestamp);
        assert_eq!(point.timestamp_nanos(), 978_307_200_000_000_000);
    }

    #[test]
    fn test_to_nanos_saturates() {
        let far = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_nanos(far), i64::MAX);
        let early = Utc.with_ymd_and_hms(1000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_nanos(early), i64::MIN);
    }
}
