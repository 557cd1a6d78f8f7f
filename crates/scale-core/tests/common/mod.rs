//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that verify architectural
//! constraints without touching real sockets.

use scale_core::config::EngineConfig;
use scale_core::error::Result;
use scale_core::traits::{IngestStream, IngestTransport, PayloadEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// The authorized sender endpoint used throughout the contract tests
pub fn allowed_peer() -> SocketAddr {
    "192.168.0.199:5001".parse().unwrap()
}

/// A controlled transport that yields events on demand
pub struct ControlledTransport {
    /// Receiver handed to the engine's payload stream
    stream_rx: Arc<std::sync::Mutex<Option<mpsc::UnboundedReceiver<PayloadEvent>>>>,
    /// Call counter for open()
    open_call_count: Arc<AtomicUsize>,
}

impl ControlledTransport {
    /// Create a controlled transport and the sender used to inject events
    pub fn new() -> (Self, mpsc::UnboundedSender<PayloadEvent>) {
        let (test_tx, stream_rx) = mpsc::unbounded_channel();

        let transport = Self {
            stream_rx: Arc::new(std::sync::Mutex::new(Some(stream_rx))),
            open_call_count: Arc::new(AtomicUsize::new(0)),
        };

        (transport, test_tx)
    }

    /// Get the number of times open() was called
    pub fn open_call_count(&self) -> usize {
        self.open_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IngestTransport for ControlledTransport {
    fn transport_name(&self) -> &'static str {
        "controlled"
    }

    async fn open(&self) -> Result<IngestStream> {
        self.open_call_count.fetch_add(1, Ordering::SeqCst);

        // Take the receiver (only called once)
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

/// A transport that never yields payloads (for idle testing)
pub struct IdleTransport;

#[async_trait::async_trait]
impl IngestTransport for IdleTransport {
    fn transport_name(&self) -> &'static str {
        "idle"
    }

    async fn open(&self) -> Result<IngestStream> {
        // Create a channel but never send anything
        let (_tx, rx) = mpsc::unbounded_channel();

        Ok(IngestStream {
            local_addr: "127.0.0.1:0".parse().unwrap(),
            payloads: Box::pin(UnboundedReceiverStream::new(rx)),
        })
    }
}

/// Helper to create a minimal EngineConfig for testing
pub fn minimal_engine_config() -> EngineConfig {
    EngineConfig {
        error_backoff_secs: 1,
        event_channel_capacity: 100,
    }
}
