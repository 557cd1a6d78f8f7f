//! Minimal embedding example for scale-core
//!
//! This example demonstrates using scale-core as a library in a custom
//! application. The engine lifecycle is fully managed by the
//! application, and payloads come from an in-process transport instead
//! of a real socket.

use scale_core::audit::MemoryAuditSink;
use scale_core::config::EngineConfig;
use scale_core::store::LatestValueStore;
use scale_core::traits::{IngestStream, IngestTransport, PayloadEvent};
use scale_core::{IngestEngine, Result};

use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Custom transport for embedded usage
struct EmbeddedTransport {
    stream_rx: Mutex<Option<mpsc::UnboundedReceiver<PayloadEvent>>>,
}

impl EmbeddedTransport {
    fn new() -> (Self, mpsc::UnboundedSender<PayloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                stream_rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl IngestTransport for EmbeddedTransport {
    fn transport_name(&self) -> &'static str {
        "embedded"
    }

    async fn open(&self) -> Result<IngestStream> {
        let rx = self
            .stream_rx
            .lock()
            .unwrap()
            .take()
            .expect("open() can only be called once");

        Ok(IngestStream {
            local_addr: "127.0.0.1:0".parse().unwrap(),
            payloads: Box::pin(UnboundedReceiverStream::new(rx)),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (transport, payload_tx) = EmbeddedTransport::new();
    let store = LatestValueStore::new();
    let audit = MemoryAuditSink::new();

    let (engine, mut event_rx) = IngestEngine::new(
        Box::new(transport),
        store.clone(),
        Some(Box::new(audit.clone())),
        EngineConfig::default(),
    )?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle =
        tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    // Feed a few payloads as if they came off the wire
    let peer: SocketAddr = "192.168.0.199:5001".parse().unwrap();
    payload_tx.send(PayloadEvent::new("RTW:0.650 kg", peer)).unwrap();
    payload_tx.send(PayloadEvent::new("hello world", peer)).unwrap();
    payload_tx.send(PayloadEvent::new("1.282KG", peer)).unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    // The slot holds the most recent reading
    let current = store.current().await.expect("a reading was published");
    println!(
        "latest: {} (weight: {:?} {})",
        current.message, current.weight, current.weight_unit
    );

    // The audit trail holds every processed payload, parse failures too
    for entry in audit.entries().await {
        println!("audited: {}", serde_json::to_string(&entry).unwrap());
    }

    // Drain engine events
    shutdown_tx.send(()).ok();
    engine_handle.await.expect("engine task")?;

    while let Ok(event) = event_rx.try_recv() {
        println!("event: {:?}", event);
    }

    Ok(())
}
