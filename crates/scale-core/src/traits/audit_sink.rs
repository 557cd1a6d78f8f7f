// # Audit Sink Trait
//
// Defines the interface for the append-only audit trail.
//
// ## Purpose
//
// Every accepted reading, including ones whose weight failed to parse,
// is appended for later inspection. Appends are best-effort from the
// engine's point of view: a failing sink is logged and never stops
// ingestion.
//
// ## Implementations
//
// - File-based newline-delimited JSON: `FileAuditSink`
// - In-memory (tests, embedding): `MemoryAuditSink`

use async_trait::async_trait;

use crate::error::Result;
use crate::reading::WeightReading;

/// Trait for audit sink implementations
///
/// All methods must be safe to call concurrently; implementations
/// serialize appends internally so concurrent records never interleave.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one reading to the trail
    async fn append(&self, reading: &WeightReading) -> Result<()>;
}

/// Shared sinks append through the same lock as their owner
#[async_trait]
impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    async fn append(&self, reading: &WeightReading) -> Result<()> {
        (**self).append(reading).await
    }
}
