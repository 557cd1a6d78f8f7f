// # UDP Ingest Transport
//
// This crate provides the connectionless ingest transport for the scale
// telemetry system.
//
// ## Purpose
//
// The scale emits one datagram per reading. This transport owns the
// bound socket and runs a single sequential receive loop, so payloads
// reach the engine in arrival order as observed by the socket layer.
//
// ## Filtering
//
// Datagrams are accepted only from the one configured sender address AND
// source port. Anything else is dropped silently with a debug trace; a
// rejection is an expected outcome, not an error.
//
// ## Resilience
//
// The socket is bound with SO_REUSEADDR so a restarted process does not
// trip over a lingering bind. After a successful bind, receive errors
// are logged and retried after a fixed backoff; a bad packet can never
// stop the loop.

use scale_core::config::IngestConfig;
use scale_core::parse::decode_payload;
use scale_core::policy::SenderPolicy;
use scale_core::registry::TransportRegistry;
use scale_core::traits::{IngestStream, IngestTransport, PayloadEvent, TransportFactory};
use scale_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Pause after a transient receive error
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Receive buffer size; scale payloads are tens of bytes
const MAX_DATAGRAM_LEN: usize = 2048;

/// Connectionless ingest transport
pub struct UdpIngest {
    /// Port to listen on (0 = kernel-assigned, for tests)
    port: u16,

    /// Allow-list over the sender's address and source port
    policy: SenderPolicy,
}

impl UdpIngest {
    /// Create a new UDP transport
    ///
    /// # Parameters
    ///
    /// - `port`: port to bind
    /// - `allowed_ip`: the single authorized sender address
    /// - `allowed_port`: the sender's fixed source port
    pub fn new(port: u16, allowed_ip: IpAddr, allowed_port: u16) -> Self {
        Self {
            port,
            policy: SenderPolicy::new(allowed_ip, allowed_port),
        }
    }

    /// Bind a datagram socket with address reuse enabled
    fn bind_reuse(port: u16) -> std::io::Result<std::net::UdpSocket> {
        use socket2::{Domain, Protocol, Socket, Type};

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;
        Ok(socket.into())
    }
}

#[async_trait::async_trait]
impl IngestTransport for UdpIngest {
    fn transport_name(&self) -> &'static str {
        "udp"
    }

    async fn open(&self) -> Result<IngestStream> {
        // Bind failure is fatal and escalates to the caller
        let std_socket = Self::bind_reuse(self.port)?;
        let socket = UdpSocket::from_std(std_socket)?;
        let local_addr = socket.local_addr()?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let policy = self.policy;

        tokio::spawn(async move {
            tracing::info!("UDP ingest listening on {}", local_addr);

            let mut buf = [0u8; MAX_DATAGRAM_LEN];

            loop {
                tokio::select! {
                    // Dropping the payload stream is the shutdown signal;
                    // racing it here keeps shutdown from waiting on a
                    // packet that will never arrive
                    _ = tx.closed() => break,

                    result = socket.recv_from(&mut buf) => match result {
                        Ok((len, peer)) => {
                            if !policy.allows(peer) {
                                tracing::debug!("Rejected packet from {} (not the allowed sender)", peer);
                                continue;
                            }

                            let Some(text) = decode_payload(&buf[..len]) else {
                                tracing::debug!("Discarding empty payload from {}", peer);
                                continue;
                            };

                            tracing::debug!("Received payload from {}: {:?}", peer, text);

                            if tx.send(PayloadEvent::new(text, peer)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!("UDP receive error: {}", e);
                            tokio::time::sleep(ERROR_BACKOFF).await;
                        }
                    }
                }
            }

            tracing::debug!("UDP receive loop stopped");
        });

        Ok(IngestStream {
            local_addr,
            payloads: Box::pin(UnboundedReceiverStream::new(rx)),
        })
    }
}

/// Factory for creating UDP transports
pub struct UdpFactory;

impl TransportFactory for UdpFactory {
    fn create(&self, config: &IngestConfig) -> Result<Box<dyn IngestTransport>> {
        match config {
            IngestConfig::Udp {
                port,
                allowed_ip,
                allowed_port,
            } => Ok(Box::new(UdpIngest::new(*port, *allowed_ip, *allowed_port))),
            _ => Err(Error::config("Invalid config for UDP transport")),
        }
    }
}

/// Register the UDP transport with a registry
pub fn register(registry: &TransportRegistry) {
    registry.register_transport("udp", Box::new(UdpFactory));
}
