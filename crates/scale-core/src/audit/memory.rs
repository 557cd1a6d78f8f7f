// # Memory Audit Sink
//
// In-memory implementation of AuditSink.
//
// ## When to Use
//
// - Tests asserting on what the engine appended
// - Library embeddings that do not want a file on disk
//
// Everything is lost when the process exits.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::reading::WeightReading;
use crate::traits::audit_sink::AuditSink;
use async_trait::async_trait;

/// Audit sink that collects readings in a vector
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    inner: Arc<RwLock<Vec<WeightReading>>>,
}

impl MemoryAuditSink {
    /// Create a new empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, oldest first
    pub async fn entries(&self) -> Vec<WeightReading> {
        self.inner.read().await.clone()
    }

    /// Number of appended readings
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether nothing has been appended yet
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, reading: &WeightReading) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.push(reading.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_memory_sink_collects_in_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty().await);

        let first = WeightReading::new(Utc::now(), "RTW:0.650 kg", Some(0.65));
        let second = WeightReading::new(Utc::now(), "garbage", None);
        sink.append(&first).await.unwrap();
        sink.append(&second).await.unwrap();

        assert_eq!(sink.len().await, 2);
        assert_eq!(sink.entries().await, vec![first, second]);
    }
}
