//! Console Sink - Human-readable output
//!
//! Prints every message as one line, the same shape live-tail clients of the
//! tail server receive.
//! Not intended for production use at high throughput.
//!
//! # Example Output
//!
//! ```text
//! 2024-06-01T07:34:59.161Z web1 nginx[info]: GET /index.html 200
//! 2024-06-01T07:34:59.162Z db1 postgres[error]: connection reset by peer
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use lumber_protocol::{LogMessage, Severity};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

use crate::{MetricsSnapshot, Sink, SinkError, SinkMetrics};

/// Configuration for console sink
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Enable colored output
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl ConsoleConfig {
    /// Create config with colors disabled (for piped output)
    pub fn no_color() -> Self {
        Self { color: false }
    }
}

// =============================================================================
// Color Styles
// =============================================================================

/// Color styles for terminal output
struct Styles {
    timestamp: Style,
    host: Style,
}

impl Styles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                timestamp: Style::new().dimmed(),
                host: Style::new().cyan(),
            }
        } else {
            Self {
                timestamp: Style::new(),
                host: Style::new(),
            }
        }
    }
}

/// Get style for severity
fn severity_style(severity: Severity, enabled: bool) -> Style {
    if !enabled {
        return Style::new();
    }
    match severity {
        Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
            Style::new().red()
        }
        Severity::Warning => Style::new().yellow(),
        Severity::Notice | Severity::Info => Style::new(),
        Severity::Debug => Style::new().dimmed(),
    }
}

/// Format one message as a plain line, without trailing newline
pub fn format_line(msg: &LogMessage) -> String {
    format!(
        "{} {} {}[{}]: {}",
        msg.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        host_or_dash(&msg.hostname),
        host_or_dash(&msg.binary_name),
        msg.severity,
        msg.message
    )
}

#[inline]
fn host_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}

// =============================================================================
// ConsoleSink Implementation
// =============================================================================

/// Console sink for debug output
pub struct ConsoleSink {
    /// Output target
    out: Mutex<Box<dyn Write + Send>>,

    /// Configuration
    config: ConsoleConfig,

    /// Sink name for logging
    name: String,

    /// Metrics
    metrics: SinkMetrics,
}

impl ConsoleSink {
    /// Create a console sink writing to stdout
    pub fn stdout(config: ConsoleConfig) -> Self {
        Self::with_writer(Box::new(io::stdout()), config)
    }

    /// Create a console sink writing to any writer
    pub fn with_writer(out: Box<dyn Write + Send>, config: ConsoleConfig) -> Self {
        Self {
            out: Mutex::new(out),
            config,
            name: "console".to_string(),
            metrics: SinkMetrics::new(),
        }
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn render(&self, msg: &LogMessage) -> String {
        if !self.config.color {
            return format_line(msg);
        }

        let styles = Styles::new(true);
        let ts = msg.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let severity = format!("[{}]", msg.severity);
        format!(
            "{} {} {}{}: {}",
            ts.style(styles.timestamp),
            host_or_dash(&msg.hostname).style(styles.host),
            host_or_dash(&msg.binary_name),
            severity.style(severity_style(msg.severity, true)),
            msg.message
        )
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, msg: Arc<LogMessage>) -> Result<(), SinkError> {
        self.metrics.message_received();
        let line = self.render(&msg);

        let mut out = self.out.lock();
        let result = writeln!(out, "{}", line).and_then(|_| out.flush());
        drop(out);

        match result {
            Ok(()) => {
                self.metrics.message_written(line.len() as u64 + 1);
                Ok(())
            }
            Err(e) => {
                self.metrics.write_error();
                Err(e.into())
            }
        }
    }

    async fn stop(&self) -> Result<(), SinkError> {
        let snapshot = self.metrics.snapshot();
        tracing::info!(
            sink = %self.name,
            messages = snapshot.messages_written,
            bytes = snapshot.bytes_written,
            errors = snapshot.write_errors,
            "console sink shutting down"
        );
        Ok(())
    }
}
