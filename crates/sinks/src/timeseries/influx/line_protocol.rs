//! Line protocol encoding
//!
//! `measurement,hostname=h,severity=s,facility=f message="..." <ns>`

use std::fmt::Write;

use crate::timeseries::Point;

/// Encode points as newline-separated line protocol, in order
pub fn encode_points(points: &[Point]) -> String {
    let mut out = String::with_capacity(points.len() * 128);
    for point in points {
        encode_point(point, &mut out);
        out.push('\n');
    }
    out
}

fn encode_point(point: &Point, out: &mut String) {
    escape_into(out, &point.measurement, &[',', ' ']);

    for (key, value) in [
        ("hostname", point.hostname.as_str()),
        ("severity", point.severity.as_str()),
        ("facility", point.facility.as_str()),
    ] {
        // Empty tag values are not allowed
        if value.is_empty() {
            continue;
        }
        out.push(',');
        out.push_str(key);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    out.push_str(" message=\"");
    escape_into(out, &point.message, &['"', '\\']);
    out.push('"');

    let _ = write!(out, " {}", point.timestamp_nanos());
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
