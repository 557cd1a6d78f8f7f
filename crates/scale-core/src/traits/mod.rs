//! Trait seams of the ingestion core
//!
//! - [`IngestTransport`]: how payloads arrive (datagram vs stream)
//! - [`AuditSink`]: where accepted readings are durably appended

pub mod audit_sink;
pub mod transport;

pub use audit_sink::AuditSink;
pub use transport::{IngestStream, IngestTransport, PayloadEvent, TransportFactory};
