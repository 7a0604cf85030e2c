//! Logging configuration
//!
//! Controls lumber's own diagnostics, not the syslog traffic it collects.
//! Collected messages may be echoed to stdout by the console sink, so
//! diagnostics default to stderr and may not share stdout with it.

use serde::Deserialize;

/// Crates whose events the configured level applies to
const LUMBER_TARGETS: &[&str] = &[
    "lumber",
    "lumber_config",
    "lumber_pipeline",
    "lumber_protocol",
    "lumber_sinks",
    "lumber_sources",
    "lumber_tap",
];

/// Level for everything outside lumber (hyper, reqwest, rustls...)
const DEPENDENCY_LEVEL: &str = "warn";

/// Diagnostic verbosity
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `EnvFilter` directive applying this level to lumber's crates only
    ///
    /// Dependencies stay at `warn` so `debug` does not drown the collector's
    /// own events in HTTP client noise.
    pub fn filter_directive(&self) -> String {
        let mut directive = String::from(DEPENDENCY_LEVEL);
        for target in LUMBER_TARGETS {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(self.as_str());
        }
        directive
    }
}

/// Diagnostic line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// Where diagnostics go
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    Stdout,
    /// Appended to the file at this path
    #[serde(untagged)]
    File(String),
}

impl LogOutput {
    /// Whether diagnostics would interleave with console-echoed messages
    pub fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout)
    }
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "/var/log/lumber/lumber.log"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
}
