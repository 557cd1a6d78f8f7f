// # Ingest Transport Trait
//
// Defines the interface for receiving payloads from the scale.
//
// ## Implementations
//
// - Connectionless (UDP): `scale-ingest-udp` crate
// - Connection-oriented (TCP): `scale-ingest-tcp` crate
//
// Both variants carry the same payload format and differ only in how
// bytes arrive; the engine consumes either through this one seam.
//
// ## Responsibility boundary
//
// A transport owns the socket lifecycle: it binds the configured
// endpoint with address reuse enabled, receives datagrams or accepts
// connections, decodes and trims each payload, and applies the sender
// allow-list. What it yields is clean text from an authorized peer.
// Parsing, publication, and auditing stay in the engine; transports
// must not touch the store.
//
// ## Task rules
//
// Receive machinery spawned by `open()` must stop when the returned
// stream is dropped. Implementations race socket reads against the
// channel's `closed()` future so shutdown is never blocked waiting for
// a packet that will not come.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::config::IngestConfig;
use crate::error::Result;

/// One decoded, allow-listed payload from the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadEvent {
    /// Trimmed payload text; never empty
    pub text: String,
    /// The sender's remote endpoint
    pub peer: SocketAddr,
    /// Receipt time (system clock)
    pub received_at: DateTime<Utc>,
}

impl PayloadEvent {
    /// Create an event stamped with the current time
    ///
    /// Public for transport implementations and test doubles.
    pub fn new(text: impl Into<String>, peer: SocketAddr) -> Self {
        Self {
            text: text.into(),
            peer,
            received_at: Utc::now(),
        }
    }
}

/// A bound, receiving transport endpoint
pub struct IngestStream {
    /// The actual bound address (observable when configured with port 0)
    pub local_addr: SocketAddr,
    /// Payload events, in arrival order as observed by the socket layer
    pub payloads: Pin<Box<dyn Stream<Item = PayloadEvent> + Send + 'static>>,
}

/// Trait for ingest transport implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IngestTransport: Send + Sync {
    /// Short name for logs and the registry ("udp", "tcp")
    fn transport_name(&self) -> &'static str;

    /// Bind the ingest endpoint and start receiving
    ///
    /// Bind failure is the one unrecoverable error in the design and is
    /// returned here; everything after a successful bind is recovered
    /// locally by the receive machinery.
    async fn open(&self) -> Result<IngestStream>;
}

/// Helper trait for constructing transports from configuration
pub trait TransportFactory: Send + Sync {
    /// Create a transport instance from configuration
    fn create(&self, config: &IngestConfig) -> Result<Box<dyn IngestTransport>>;
}
