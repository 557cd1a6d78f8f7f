// # TCP Ingest Transport
//
// This crate provides the connection-oriented ingest transport for the
// scale telemetry system.
//
// ## Purpose
//
// Some scale firmware opens a TCP connection per reading (or keeps one
// open and writes a reading at a time). The accept loop filters by peer
// address only; the sender's ephemeral port changes across connections,
// so there is no port check here.
//
// ## Connection handling
//
// Each accepted connection is handed to an independent spawned reader
// task and the loop immediately returns to accepting, so overlapping
// connections are fine. Each read chunk is decoded and trimmed on its
// own; a message is assumed to arrive within one read, and nothing is
// reassembled across reads. A zero-length read is the peer closing, a
// stream I/O error ends that task only; the listener and the other
// connections never notice.

use scale_core::config::IngestConfig;
use scale_core::parse::decode_payload;
use scale_core::policy::SenderPolicy;
use scale_core::registry::TransportRegistry;
use scale_core::traits::{IngestStream, IngestTransport, PayloadEvent, TransportFactory};
use scale_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Pause after a transient accept error
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Per-read buffer size; one chunk carries one message
const MAX_CHUNK_LEN: usize = 2048;

/// Listen backlog for the accept queue
const LISTEN_BACKLOG: u32 = 1024;

/// Connection-oriented ingest transport
pub struct TcpIngest {
    /// Port to listen on (0 = kernel-assigned, for tests)
    port: u16,

    /// Allow-list over the sender's address; ports are not checked
    policy: SenderPolicy,
}

impl TcpIngest {
    /// Create a new TCP transport
    ///
    /// # Parameters
    ///
    /// - `port`: port to bind
    /// - `allowed_ip`: the single authorized sender address
    pub fn new(port: u16, allowed_ip: IpAddr) -> Self {
        Self {
            port,
            policy: SenderPolicy::address_only(allowed_ip),
        }
    }
}

#[async_trait::async_trait]
impl IngestTransport for TcpIngest {
    fn transport_name(&self) -> &'static str {
        "tcp"
    }

    async fn open(&self) -> Result<IngestStream> {
        // Bind failure is fatal and escalates to the caller. Address
        // reuse keeps quick restarts from hitting a lingering bind.
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port))?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let policy = self.policy;

        tokio::spawn(async move {
            tracing::info!("TCP ingest listening on {}", local_addr);

            loop {
                tokio::select! {
                    // Dropping the payload stream is the shutdown signal;
                    // in-flight connection tasks are left to end naturally
                    _ = tx.closed() => break,

                    result = listener.accept() => match result {
                        Ok((stream, peer)) => {
                            if !policy.allows(peer) {
                                tracing::debug!("Rejected connection from {} (not the allowed sender)", peer);
                                // Dropping the stream closes it immediately
                                continue;
                            }

                            tracing::debug!("Accepted connection from {}", peer);

                            // Fire-and-forget: reader errors must never
                            // reach the accept loop
                            tokio::spawn(read_connection(stream, peer, tx.clone()));
                        }
                        Err(e) => {
                            tracing::error!("TCP accept error: {}", e);
                            tokio::time::sleep(ERROR_BACKOFF).await;
                        }
                    }
                }
            }

            tracing::debug!("TCP accept loop stopped");
        });

        Ok(IngestStream {
            local_addr,
            payloads: Box::pin(UnboundedReceiverStream::new(rx)),
        })
    }
}

/// Read payloads from one accepted connection until the peer goes away
async fn read_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<PayloadEvent>,
) {
    let mut buf = [0u8; MAX_CHUNK_LEN];

    loop {
        match stream.read(&mut buf).await {
            // Zero-length read: peer-initiated close, expected
            Ok(0) => {
                tracing::debug!("Peer {} closed the connection", peer);
                break;
            }
            Ok(n) => {
                // One chunk = one message; empty chunks carry nothing
                let Some(text) = decode_payload(&buf[..n]) else {
                    continue;
                };

                tracing::debug!("Received payload from {}: {:?}", peer, text);

                if tx.send(PayloadEvent::new(text, peer)).is_err() {
                    break;
                }
            }
            // Stream I/O errors end this task without affecting the
            // listener or other connections
            Err(e) => {
                tracing::debug!("Connection from {} ended: {}", peer, e);
                break;
            }
        }
    }
}

/// Factory for creating TCP transports
pub struct TcpFactory;

impl TransportFactory for TcpFactory {
    fn create(&self, config: &IngestConfig) -> Result<Box<dyn IngestTransport>> {
        match config {
            IngestConfig::Tcp { port, allowed_ip } => {
                Ok(Box::new(TcpIngest::new(*port, *allowed_ip)))
            }
            _ => Err(Error::config("Invalid config for TCP transport")),
        }
    }
}

/// Register the TCP transport with a registry
pub fn register(registry: &TransportRegistry) {
    registry.register_transport("tcp", Box::new(TcpFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio_stream::StreamExt;

    fn loopback_target(stream: &IngestStream) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), stream.local_addr.port())
    }

    async fn next_payload(stream: &mut IngestStream) -> PayloadEvent {
        tokio::time::timeout(Duration::from_secs(2), stream.payloads.next())
            .await
            .expect("payload within timeout")
            .expect("stream still open")
    }

    #[test]
    fn test_factory_creation() {
        let factory = TcpFactory;

        let config = IngestConfig::Tcp {
            port: 3666,
            allowed_ip: "192.168.0.199".parse().unwrap(),
        };
        assert!(factory.create(&config).is_ok());

        let config = IngestConfig::Udp {
            port: 3666,
            allowed_ip: "192.168.0.199".parse().unwrap(),
            allowed_port: 5001,
        };
        assert!(factory.create(&config).is_err());
    }

    #[tokio::test]
    async fn test_allowed_connection_payload_is_delivered() {
        let transport = TcpIngest::new(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut stream = transport.open().await.unwrap();

        let mut conn = TcpStream::connect(loopback_target(&stream)).await.unwrap();
        conn.write_all(b"RTW:0.550 kg").await.unwrap();
        conn.shutdown().await.unwrap();

        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "RTW:0.550 kg");
        assert_eq!(event.peer.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_each_chunk_is_one_message() {
        let transport = TcpIngest::new(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut stream = transport.open().await.unwrap();

        let mut conn = TcpStream::connect(loopback_target(&stream)).await.unwrap();

        conn.write_all(b"RTW:0.650 kg").await.unwrap();
        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "RTW:0.650 kg");

        conn.write_all(b"1.282KG").await.unwrap();
        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "1.282KG");
    }

    #[tokio::test]
    async fn test_disallowed_peer_is_closed_immediately() {
        // Only 127.0.0.2 is authorized; connecting from 127.0.0.1 must
        // be rejected at accept time
        let transport = TcpIngest::new(0, "127.0.0.2".parse().unwrap());
        let mut stream = transport.open().await.unwrap();

        let mut conn = TcpStream::connect(loopback_target(&stream)).await.unwrap();
        let _ = conn.write_all(b"RTW:9.999 kg").await;

        // The listener closed us; the read drains to EOF (or reset)
        let mut sink = Vec::new();
        let closed = tokio::time::timeout(Duration::from_secs(2), conn.read_to_end(&mut sink)).await;
        assert!(closed.is_ok(), "rejected connection should be closed");

        // And nothing reached the payload stream
        let nothing =
            tokio::time::timeout(Duration::from_millis(200), stream.payloads.next()).await;
        assert!(nothing.is_err(), "no payload from a rejected peer");
    }

    #[tokio::test]
    async fn test_overlapping_connections_are_supported() {
        let transport = TcpIngest::new(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut stream = transport.open().await.unwrap();
        let target = loopback_target(&stream);

        let mut first = TcpStream::connect(target).await.unwrap();
        let mut second = TcpStream::connect(target).await.unwrap();

        // Both connections are live at once
        first.write_all(b"RTW:0.550 kg").await.unwrap();
        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "RTW:0.550 kg");

        second.write_all(b"RTW:0.650 kg").await.unwrap();
        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "RTW:0.650 kg");

        first.write_all(b"1.282KG").await.unwrap();
        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "1.282KG");
    }

    #[tokio::test]
    async fn test_peer_close_does_not_stop_the_listener() {
        let transport = TcpIngest::new(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut stream = transport.open().await.unwrap();
        let target = loopback_target(&stream);

        // First connection opens and closes without writing
        let conn = TcpStream::connect(target).await.unwrap();
        drop(conn);

        // The listener keeps accepting
        let mut conn = TcpStream::connect(target).await.unwrap();
        conn.write_all(b"RTW:0.650 kg").await.unwrap();

        let event = next_payload(&mut stream).await;
        assert_eq!(event.text, "RTW:0.650 kg");
    }
}
