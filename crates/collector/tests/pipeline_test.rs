//! End-to-end tests for the collector pipeline
//!
//! These tests wire the real components together the way `lumber serve`
//! does: syslog listener -> aggregate dispatcher -> time-series writer
//! (in-memory backend) + broadcast hub, and read results back through the
//! query reader and the tail server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lumber_pipeline::AggregateWriter;
use lumber_protocol::{ParseMode, QueryParams, Severity};
use lumber_sinks::timeseries::memory::MemoryBackend;
use lumber_sinks::{Sink, TimeSeriesStore, TimeSeriesWriter, WriterConfig};
use lumber_sources::{SyslogServer, SyslogServerConfig, SyslogSourceError, Transport};
use lumber_tap::{BroadcastHub, HubConfig, TailServer, TailServerConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Running pipeline with handles for assertions
struct Pipeline {
    cancel: CancellationToken,
    backend: Arc<MemoryBackend>,
    store: Arc<TimeSeriesWriter>,
    hub: Arc<BroadcastHub>,
    dispatcher: Arc<AggregateWriter>,
    syslog: SyslogServer,
    errors: mpsc::Receiver<SyslogSourceError>,
}

impl Pipeline {
    async fn start(config: SyslogServerConfig) -> Self {
        let cancel = CancellationToken::new();
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(TimeSeriesWriter::new(
            Arc::clone(&backend) as _,
            WriterConfig::default().with_write_interval(Duration::from_millis(50)),
            &cancel,
        ));
        let hub = Arc::new(BroadcastHub::new(HubConfig::default(), &cancel));

        let dispatcher = Arc::new(AggregateWriter::new(vec![
            Arc::clone(&store) as Arc<dyn Sink>,
            Arc::clone(&hub) as Arc<dyn Sink>,
        ]));
        dispatcher.start().await.unwrap();

        let (errors_tx, errors) = mpsc::channel(4);
        let syslog = SyslogServer::new(
            config,
            Arc::clone(&dispatcher) as Arc<dyn Sink>,
            &cancel,
            errors_tx,
        );
        syslog.start().await.unwrap();

        Self {
            cancel,
            backend,
            store,
            hub,
            dispatcher,
            syslog,
            errors,
        }
    }

    fn addr(&self, transport: Transport) -> std::net::SocketAddr {
        self.syslog.local_addr(transport).unwrap()
    }

    /// Wait until `n` points for `app` reached the backend
    async fn wait_for_points(&self, app: &str, n: usize) {
        timeout(WAIT, async {
            while self.backend.points(app).len() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("points never reached the backend");
    }

    async fn query(&self, params: QueryParams) -> Vec<String> {
        let mut reader = self.store.result_reader(params);
        let mut lines = Vec::new();
        while let Some(chunk) = reader.read_next().await.unwrap() {
            let text = String::from_utf8(chunk.to_vec()).unwrap();
            lines.extend(text.lines().map(str::to_string));
        }
        lines
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        timeout(WAIT, self.syslog.wait()).await.unwrap();
        timeout(WAIT, self.dispatcher.wait()).await.unwrap();
    }
}

#[tokio::test]
async fn test_tcp_message_reaches_store_and_hub() {
    let pipeline = Pipeline::start(SyslogServerConfig::tcp("127.0.0.1:0")).await;
    let (_, mut live) = pipeline.hub.subscribe().await.unwrap();

    let mut client = TcpStream::connect(pipeline.addr(Transport::Tcp)).await.unwrap();
    client
        .write_all(b"<14>1 2024-05-01T12:00:00Z web-1 nginx 123 - - GET /healthz 200\n")
        .await
        .unwrap();

    let msg = timeout(WAIT, live.recv()).await.unwrap().unwrap();
    assert_eq!(msg.binary_name, "nginx");
    assert_eq!(msg.hostname, "web-1");
    assert_eq!(msg.severity, Severity::Info);
    assert_eq!(msg.message, "GET /healthz 200");

    pipeline.wait_for_points("nginx", 1).await;
    let lines = pipeline.query(QueryParams::new("nginx")).await;
    assert_eq!(lines, vec!["GET /healthz 200"]);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_host_filter_and_start_bound() {
    let pipeline = Pipeline::start(SyslogServerConfig::tcp("127.0.0.1:0")).await;

    let mut client = TcpStream::connect(pipeline.addr(Transport::Tcp)).await.unwrap();
    client
        .write_all(
            b"<14>1 2024-05-01T12:00:00Z h1 app - - - from h1\n\
              <14>1 2024-05-01T12:00:01Z h2 app - - - from h2\n",
        )
        .await
        .unwrap();
    pipeline.wait_for_points("app", 2).await;

    let h1 = pipeline
        .query(QueryParams::new("app").with_hostname("h1"))
        .await;
    assert_eq!(h1, vec!["from h1"]);

    let after = pipeline
        .query(QueryParams::new("app").with_start(Utc::now()))
        .await;
    assert!(after.is_empty());

    // Listing is stable without intervening writes
    let first = pipeline.store.list().await.unwrap();
    let second = pipeline.store.list().await.unwrap();
    assert_eq!(first, vec!["app".to_string()]);
    assert_eq!(first, second);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_udp_rfc3164_uses_receipt_time() {
    let config = SyslogServerConfig::udp("127.0.0.1:0").with_format(ParseMode::Rfc3164);
    let pipeline = Pipeline::start(config).await;

    let before = Utc::now();
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(
            b"<13>Jan  1 00:00:00 old-host cron[42]: nightly job\n",
            pipeline.addr(Transport::Udp),
        )
        .await
        .unwrap();

    pipeline.wait_for_points("cron", 1).await;
    let points = pipeline.backend.points("cron");
    assert_eq!(points[0].hostname, "old-host");
    assert_eq!(points[0].message, "nightly job");
    assert!(points[0].timestamp >= before);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let pipeline = Pipeline::start(SyslogServerConfig::tcp("127.0.0.1:0")).await;

    let mut client = TcpStream::connect(pipeline.addr(Transport::Tcp)).await.unwrap();
    client
        .write_all(b"<999>garbage\n<14>1 2024-05-01T12:00:00Z h app - - - still here\n")
        .await
        .unwrap();

    pipeline.wait_for_points("app", 1).await;
    assert_eq!(pipeline.syslog.metrics().messages_malformed, 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_final_flush_on_shutdown() {
    let pipeline = Pipeline::start(SyslogServerConfig::tcp("127.0.0.1:0")).await;
    let (_, mut live) = pipeline.hub.subscribe().await.unwrap();

    let mut client = TcpStream::connect(pipeline.addr(Transport::Tcp)).await.unwrap();
    client
        .write_all(b"<14>1 2024-05-01T12:00:00Z h app - - - last words\n")
        .await
        .unwrap();
    // Seen by the dispatcher, so it is in the writer's buffer or flushed
    timeout(WAIT, live.recv()).await.unwrap().unwrap();

    let backend = Arc::clone(&pipeline.backend);
    pipeline.shutdown().await;

    assert_eq!(backend.points("app").len(), 1);
}

#[tokio::test]
async fn test_tail_client_receives_formatted_lines() {
    let pipeline = Pipeline::start(SyslogServerConfig::tcp("127.0.0.1:0")).await;

    let tail = TailServer::new(
        Arc::clone(&pipeline.hub),
        TailServerConfig::default().with_address("127.0.0.1:0"),
        &pipeline.cancel,
    );
    let listener = tail.bind().await.unwrap();
    let tail_addr = listener.local_addr().unwrap();
    let tail_task = tokio::spawn(async move { tail.serve(listener).await });

    let viewer = TcpStream::connect(tail_addr).await.unwrap();
    let mut viewer = BufReader::new(viewer).lines();

    // The viewer's subscription is registered asynchronously
    timeout(WAIT, async {
        while pipeline.hub.subscriber_count().await.unwrap() < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let mut client = TcpStream::connect(pipeline.addr(Transport::Tcp)).await.unwrap();
    client
        .write_all(b"<14>1 2024-05-01T12:00:00.000Z web-1 nginx - - - GET /healthz 200\n")
        .await
        .unwrap();

    let line = timeout(WAIT, viewer.next_line()).await.unwrap().unwrap().unwrap();
    assert_eq!(line, "2024-05-01T12:00:00.000Z web-1 nginx[info]: GET /healthz 200");

    pipeline.shutdown().await;
    timeout(WAIT, tail_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_bind_failure_reported_on_error_channel() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let mut pipeline = Pipeline::start(SyslogServerConfig::tcp(address.clone())).await;

    let err = timeout(WAIT, pipeline.errors.recv()).await.unwrap().unwrap();
    match err {
        SyslogSourceError::Bind {
            transport,
            address: reported,
            ..
        } => {
            assert_eq!(transport, Transport::Tcp);
            assert_eq!(reported, address);
        }
        other => panic!("unexpected error: {other}"),
    }

    pipeline.shutdown().await;
}
