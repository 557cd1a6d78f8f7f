//! Core ingestion engine
//!
//! The IngestEngine is responsible for:
//! - Receiving payload events via IngestTransport
//! - Extracting the weight from each payload
//! - Publishing the reading to the LatestValueStore
//! - Appending the reading to the AuditSink
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │IngestTransport│─── PayloadEvent ────┐
//! └───────────────┘                     │
//!                                       ▼
//!                              ┌──────────────┐
//!                              │ IngestEngine │
//!                              └──────────────┘
//!                                       │
//!          ┌────────────────────────────┼───────────────────────────┐
//!          │                            │                           │
//!          ▼                            ▼                           ▼
//! ┌─────────────────┐          ┌──────────────┐           ┌─────────────┐
//! │LatestValueStore │          │  AuditSink   │           │   Events    │
//! │ (publish)       │          │  (append)    │           │  (notify)   │
//! └─────────────────┘          └──────────────┘           └─────────────┘
//! ```
//!
//! ## Payload Flow
//!
//! 1. Transport yields a decoded, allow-listed payload
//! 2. Extract the weight digits and convert to f64
//! 3. Construct a WeightReading (weight absent on parse failure)
//! 4. Publish unconditionally to the store (overwrite)
//! 5. Append to the audit sink, best-effort
//! 6. Emit an event for monitoring/logging

use crate::config::EngineConfig;
use crate::error::Result;
use crate::parse::extract_weight;
use crate::reading::WeightReading;
use crate::store::LatestValueStore;
use crate::traits::{AuditSink, IngestTransport, PayloadEvent};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

/// Events emitted by the IngestEngine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Engine started and is about to bind its transport
    Started {
        transport: String,
    },

    /// A payload was processed and published
    ReadingPublished {
        message: String,
        weight: Option<f64>,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Core ingestion engine
///
/// The engine owns the whole receive → parse → publish flow. It runs
/// continuously, surviving malformed payloads and transient errors,
/// until a shutdown signal is received.
///
/// ## Lifecycle
///
/// 1. Create with [`IngestEngine::new()`]
/// 2. Start with [`IngestEngine::run()`]
/// 3. Engine runs until shutdown signal received
/// 4. Drop to cleanup
///
/// ## Resilience
///
/// After a successful bind, nothing that arrives on the wire can stop
/// the loop: a failing iteration is logged and the loop resumes after a
/// fixed backoff. Bind failure is the one fatal error and is escalated
/// to the caller.
pub struct IngestEngine {
    /// Transport delivering payload events
    transport: Box<dyn IngestTransport>,

    /// Shared single-slot cache, also read by the query service
    store: LatestValueStore,

    /// Optional append-only audit trail
    audit: Option<Box<dyn AuditSink>>,

    /// Pause after a failed iteration (in seconds)
    error_backoff_secs: u64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl IngestEngine {
    /// Create a new ingestion engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events.
    pub fn new(
        transport: Box<dyn IngestTransport>,
        store: LatestValueStore,
        audit: Option<Box<dyn AuditSink>>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            transport,
            store,
            audit,
            error_backoff_secs: config.error_backoff_secs,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine
    ///
    /// Binds the transport and processes payloads until ctrl-c.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Bind failure (fatal)
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Internal run implementation that accepts an optional shutdown signal
    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            transport: self.transport.transport_name().to_string(),
        });

        // Bind failure is the one unrecoverable error; escalate it
        let stream = self.transport.open().await?;
        info!(
            "Listening for scale payloads on {} ({})",
            stream.local_addr,
            self.transport.transport_name()
        );

        let mut payloads = stream.payloads;

        // Main event loop
        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for provided shutdown signal
            loop {
                tokio::select! {
                    // Handle payloads
                    Some(event) = payloads.next() => {
                        if let Err(e) = self.handle_payload(event).await {
                            error!("Failed to process payload: {}", e);
                            self.backoff().await;
                        }
                    }

                    // Handle test shutdown signal
                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    // Handle payloads
                    Some(event) = payloads.next() => {
                        if let Err(e) = self.handle_payload(event).await {
                            error!("Failed to process payload: {}", e);
                            // Continue running despite errors
                            self.backoff().await;
                        }
                    }

                    // Handle shutdown signal (production)
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        // Dropping the payload stream stops the transport's receive tasks
        info!("Ingestion stopped");

        Ok(())
    }

    /// Process one payload event
    async fn handle_payload(&self, event: PayloadEvent) -> Result<()> {
        let weight = match extract_weight(&event.text) {
            // Matched digits are dot-and-digit only, so conversion cannot
            // fail; a non-finite result from a pathological digit run is
            // discarded like a failed parse
            Some(digits) => digits.parse::<f64>().ok().filter(|w| w.is_finite()),
            None => None,
        };

        if weight.is_none() {
            warn!("Could not extract weight from message: {:?}", event.text);
        }

        let reading = WeightReading::new(event.received_at, event.text.clone(), weight);

        // Publish unconditionally, even when parsing failed: the slot
        // always reflects the most recently processed payload
        self.store.publish(reading.clone()).await;

        // Audit append is best-effort; a failing sink never stops ingestion
        if let Some(sink) = &self.audit {
            if let Err(e) = sink.append(&reading).await {
                warn!("Audit append failed: {}", e);
            }
        }

        info!("Processed message: {}", reading.message);
        if let Some(w) = reading.weight {
            info!("Extracted weight: {} {}", w, reading.weight_unit);
        }

        self.emit_event(EngineEvent::ReadingPublished {
            message: reading.message,
            weight: reading.weight,
        });

        Ok(())
    }

    /// Fixed pause after a failed iteration
    async fn backoff(&self) {
        tokio::time::sleep(tokio::time::Duration::from_secs(self.error_backoff_secs)).await;
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Send event, logging a warning if the channel is full; dropping
        // keeps memory bounded when the consumer is slower than ingestion
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// # Visibility
    ///
    /// This is `pub` for testing purposes only.
    ///
    /// **TESTING ONLY**: Architecture contract tests require controlled
    /// shutdown. Production daemon code should use `run()` instead, which
    /// manages shutdown via the OS signal rather than programmatic
    /// channels.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }
}
