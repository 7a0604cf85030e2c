//! Query and list commands - Read stored logs back
//!
//! # Usage
//!
//! ```bash
//! lumber query --app nginx
//! lumber query --app nginx --host web-1 --start 2024-05-01T00:00:00Z
//! lumber list
//! ```
//!
//! Only one time bound is applied: `--start` wins when both are given.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use lumber_config::Config;
use lumber_protocol::QueryParams;
use lumber_sinks::{Reader, TimeSeriesStore};
use tokio_util::sync::CancellationToken;

use crate::store_builder;

/// Query command arguments
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Application name to read
    #[arg(short, long)]
    pub app: String,

    /// Only lines from this host
    #[arg(long)]
    pub host: Option<String>,

    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound (RFC 3339), ignored when --start is given
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,
}

impl QueryArgs {
    fn params(&self) -> QueryParams {
        QueryParams {
            binary_name: self.app.clone(),
            hostname: self.host.clone(),
            start_date: self.start,
            end_date: self.end,
            ..Default::default()
        }
    }
}

/// Run the query command, streaming result lines to stdout
pub async fn run(config: &Config, args: QueryArgs) -> Result<()> {
    let store = store_builder::build_store(&config.datastore, &CancellationToken::new())?;
    let reader = store.result_reader(args.params());

    let mut stdout = std::io::stdout();
    let lines = drain(reader, &mut stdout)
        .await
        .with_context(|| format!("query for '{}' failed", args.app))?;

    tracing::debug!(app = %args.app, lines, "query complete");
    Ok(())
}

/// Run the list command, printing one application name per line
pub async fn list(config: &Config) -> Result<()> {
    let store = store_builder::build_store(&config.datastore, &CancellationToken::new())?;
    let names = store.list().await.context("failed to list applications")?;

    let mut stdout = std::io::stdout().lock();
    for name in names {
        writeln!(stdout, "{name}")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Copy every chunk from `reader` to `out` until end of results
///
/// Returns the number of lines written.
async fn drain<W: Write>(mut reader: Box<dyn Reader>, out: &mut W) -> Result<usize> {
    let mut lines = 0;
    while let Some(chunk) = reader.read_next().await? {
        lines += chunk.iter().filter(|&&b| b == b'\n').count();
        out.write_all(&chunk)?;
    }
    out.flush()?;
    Ok(lines)
}
