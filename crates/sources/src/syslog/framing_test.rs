//! Tests for TCP syslog framing

use tokio::io::BufReader;

use super::*;
use crate::common::trim_trailing_newline;

/// Read every frame from `input`, rendering each as a string (or a marker)
async fn frames(input: &[u8], max_size: usize, capacity: usize) -> Vec<String> {
    let mut reader = BufReader::with_capacity(capacity, input);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match read_frame(&mut reader, &mut buf, max_size).await.unwrap() {
            Frame::Message(_) => {
                out.push(String::from_utf8_lossy(trim_trailing_newline(&buf)).into_owned());
            }
            Frame::TooLong => out.push("<too long>".into()),
            Frame::Eof => break,
        }
    }
    out
}

// =============================================================================
// Newline framing
// =============================================================================

#[tokio::test]
async fn test_newline_frames() {
    let got = frames(b"<13>one\n<13>two\r\n<13>three", 1024, 64).await;
    assert_eq!(got, vec!["<13>one", "<13>two", "<13>three"]);
}

#[tokio::test]
async fn test_newline_frames_small_buffer() {
    // Frames span several fill_buf calls
    let got = frames(b"<13>first message\n<13>second\n", 1024, 4).await;
    assert_eq!(got, vec!["<13>first message", "<13>second"]);
}

#[tokio::test]
async fn test_empty_line_is_empty_frame() {
    let got = frames(b"\n<13>x\n", 1024, 64).await;
    assert_eq!(got, vec!["", "<13>x"]);
}

#[tokio::test]
async fn test_oversized_line_skipped() {
    let long = format!("<13>{}\n<13>ok\n", "a".repeat(100));
    let got = frames(long.as_bytes(), 16, 8).await;
    assert_eq!(got, vec!["<too long>", "<13>ok"]);
}

#[tokio::test]
async fn test_line_at_limit_is_accepted() {
    let got = frames(b"12345678\n", 8, 64).await;
    // Leading digit without a space is plain text, not a count
    assert_eq!(got, vec!["12345678"]);
}

#[tokio::test]
async fn test_returns_consumed_bytes() {
    let mut reader = BufReader::new(&b"<13>abc\r\n"[..]);
    let mut buf = Vec::new();
    assert_eq!(read_frame(&mut reader, &mut buf, 1024).await.unwrap(), Frame::Message(9));
    assert_eq!(read_frame(&mut reader, &mut buf, 1024).await.unwrap(), Frame::Eof);
}

// =============================================================================
// Octet counting
// =============================================================================

#[tokio::test]
async fn test_octet_counted_frames() {
    let got = frames(b"7 <13>one9 <13>two\nx", 1024, 64).await;
    assert_eq!(got, vec!["<13>one", "<13>two\nx"]);
}

#[tokio::test]
async fn test_mixed_framing() {
    let got = frames(b"7 <13>one<13>two\n", 1024, 3).await;
    assert_eq!(got, vec!["<13>one", "<13>two"]);
}

#[tokio::test]
async fn test_octet_count_over_limit_is_skipped() {
    let input = format!("20 {}<13>next\n", "b".repeat(20));
    let got = frames(input.as_bytes(), 10, 64).await;
    assert_eq!(got, vec!["<too long>", "<13>next"]);
}

#[tokio::test]
async fn test_truncated_counted_frame_is_eof() {
    let got = frames(b"50 <13>short", 1024, 64).await;
    assert!(got.is_empty());
}

#[tokio::test]
async fn test_digits_without_space_fall_back_to_line() {
    let got = frames(b"42abc\n", 1024, 64).await;
    assert_eq!(got, vec!["42abc"]);
}
