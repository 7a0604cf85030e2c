//! Serve command - Run the collector
//!
//! Wires the syslog listener through the aggregate dispatcher into the
//! time-series writer, the broadcast hub and (optionally) the console, then
//! runs until a shutdown signal or a fatal listener error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lumber_config::{Config, SyslogConfig, TailConfig};
use lumber_pipeline::AggregateWriter;
use lumber_sinks::{ConsoleConfig, ConsoleSink, Sink};
use lumber_sources::{SyslogServer, SyslogServerConfig, SyslogSourceError, Transport};
use lumber_tap::{BroadcastHub, HubConfig, TailServer, TailServerConfig};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::store_builder;

/// Fatal errors are reported at most once per endpoint
const ERROR_CHANNEL_SIZE: usize = 4;

/// Upper bound on waiting for the tail server after cancellation
const TAIL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the serve command
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "lumber starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("lumber shutdown complete");
    Ok(())
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    // One token reaches every listener and worker
    let cancel = CancellationToken::new();
    let (errors_tx, mut errors_rx) = mpsc::channel::<SyslogSourceError>(ERROR_CHANNEL_SIZE);

    let store = Arc::new(store_builder::build_store(&config.datastore, &cancel)?);
    let hub = Arc::new(BroadcastHub::new(hub_config(&config.tail), &cancel));

    // Bind the tail port before anything runs so a bad address fails fast
    let tail = if config.tail.enabled {
        let server = TailServer::new(Arc::clone(&hub), tail_config(&config.tail), &cancel);
        let listener = server.bind().await.context("failed to start tail server")?;
        Some((server, listener))
    } else {
        None
    };

    let mut sinks = vec![
        Arc::clone(&store) as Arc<dyn Sink>,
        Arc::clone(&hub) as Arc<dyn Sink>,
    ];
    if config.syslog.log_to_stdout {
        sinks.push(Arc::new(ConsoleSink::stdout(console_config(&config.syslog))));
    }

    let dispatcher = Arc::new(AggregateWriter::new(sinks));
    dispatcher.start().await.context("failed to start sinks")?;

    let syslog = SyslogServer::new(
        syslog_server_config(&config.syslog),
        Arc::clone(&dispatcher) as Arc<dyn Sink>,
        &cancel,
        errors_tx,
    );
    if let Err(e) = syslog.start().await {
        cancel.cancel();
        dispatcher.wait().await;
        return Err(e).context("failed to start syslog listener");
    }

    let tail_task: Option<JoinHandle<()>> = tail.map(|(server, listener)| {
        tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                error!(error = %e, "tail server failed");
            }
        })
    });

    info!(
        tcp = ?syslog.local_addr(Transport::Tcp),
        udp = ?syslog.local_addr(Transport::Udp),
        backend = store.name(),
        sinks = ?dispatcher.sink_names(),
        tail = config.tail.enabled,
        "lumber running"
    );

    let fatal = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping collector...");
            None
        }
        Some(e) = errors_rx.recv() => {
            error!(error = %e, "listener failed, stopping collector...");
            Some(e)
        }
    };

    cancel.cancel();

    info!("waiting for syslog listener to drain...");
    syslog.wait().await;

    info!("waiting for sinks to flush...");
    dispatcher.wait().await;

    // Writes that raced the final periodic flush
    if let Err(e) = store.flush().await {
        warn!(error = %e, "final flush failed");
    }

    if let Some(task) = tail_task {
        match tokio::time::timeout(TAIL_SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "tail server task panicked"),
            Err(_) => warn!("tail server did not finish within timeout"),
        }
    }

    match fatal {
        Some(e) => Err(e).context("syslog listener failed"),
        None => Ok(()),
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// =============================================================================
// Config mapping
// =============================================================================

fn syslog_server_config(config: &SyslogConfig) -> SyslogServerConfig {
    SyslogServerConfig {
        tcp_address: config.tcp.enabled.then(|| config.tcp.bind_address()),
        udp_address: config.udp.enabled.then(|| config.udp.bind_address()),
        format: config.format,
        max_message_size: config.max_message_size,
        connection_timeout: config.connection_timeout,
        ..Default::default()
    }
}

fn console_config(config: &SyslogConfig) -> ConsoleConfig {
    if config.color {
        ConsoleConfig::default()
    } else {
        ConsoleConfig::no_color()
    }
}

fn hub_config(config: &TailConfig) -> HubConfig {
    HubConfig::default()
        .with_subscriber_buffer(config.subscriber_buffer)
        .with_max_subscribers(config.max_connections)
}

fn tail_config(config: &TailConfig) -> TailServerConfig {
    TailServerConfig {
        max_connections: config.max_connections,
        ..TailServerConfig::default().with_address(&config.address)
    }
}
