//! Lumber - Centralized syslog collector
//!
//! # Usage
//!
//! ```bash
//! # Run the collector (default)
//! lumber
//! lumber --config configs/lumber.toml
//!
//! # Read stored logs back
//! lumber query --app nginx --host web-1 --start 2024-05-01T00:00:00Z
//! lumber list
//! ```

mod cmd;
mod store_builder;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumber_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Lumber - Centralized syslog collector
#[derive(Parser, Debug)]
#[command(name = "lumber")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log filter (e.g. "debug" or "lumber_sinks=trace"). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector
    Serve,

    /// Stream stored log lines for one application
    Query(cmd::query::QueryArgs),

    /// List application names known to the store
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref())?;

    // A CLI value is taken as a raw filter directive
    let directive = cli
        .log_level
        .unwrap_or_else(|| config.log.level.filter_directive());
    init_logging(&directive, &config.log)?;

    match cli.command {
        // No subcommand = run the collector
        Some(Command::Serve) | None => cmd::serve::run(config).await,
        Some(Command::Query(args)) => cmd::query::run(&config, args).await,
        Some(Command::List) => cmd::query::list(&config).await,
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(directive: &str, log: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let layer = match &log.output {
        LogOutput::Stderr => fmt_layer(log.format, std::io::stderr),
        LogOutput::Stdout => fmt_layer(log.format, std::io::stdout),
        LogOutput::File(path) => fmt_layer(log.format, Mutex::new(open_log_file(path)?)),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}

fn fmt_layer<W>(format: LogFormat, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    }
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(path))
        .with_context(|| format!("failed to open log file {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::try_parse_from(["lumber"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::try_parse_from([
            "lumber",
            "query",
            "--app",
            "nginx",
            "--host",
            "web-1",
            "--start",
            "2024-05-01T00:00:00Z",
            "-c",
            "lumber.toml",
        ])
        .unwrap();

        let Some(Command::Query(args)) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.app, "nginx");
        assert_eq!(args.host.as_deref(), Some("web-1"));
        assert!(args.start.is_some());
        assert!(args.end.is_none());
        assert_eq!(cli.config.as_deref(), Some(Path::new("lumber.toml")));
    }

    #[test]
    fn test_query_requires_app() {
        assert!(Cli::try_parse_from(["lumber", "query"]).is_err());
    }

    #[test]
    fn test_query_rejects_bad_timestamp() {
        assert!(Cli::try_parse_from(["lumber", "query", "--app", "a", "--start", "yesterday"]).is_err());
    }

    #[test]
    fn test_default_config_loads() {
        let config: lumber_config::Config = cmd::load_config(None).unwrap();
        assert!(config.tail.enabled);
    }
}
