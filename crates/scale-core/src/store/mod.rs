// # Latest Value Store
//
// Thread-safe single-slot cache holding the most recent weight reading.
//
// ## Purpose
//
// The ingestion engine overwrites the slot on every processed payload;
// the query service reads it at arbitrary concurrent times. No history
// is retained and nothing survives a restart.
//
// ## Consistency
//
// One RwLock guards both operations, so readers always observe a
// complete reading, never a partially-written one.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::reading::WeightReading;

/// Shared single-slot cache of the most recent reading
///
/// The handle is cheap to clone; all clones share one slot. The instance
/// is constructed once at startup and passed by shared reference to both
/// the ingestion and the query paths.
///
/// # Example
///
/// ```rust,no_run
/// use scale_core::store::LatestValueStore;
/// use scale_core::reading::WeightReading;
/// use chrono::Utc;
///
/// #[tokio::main]
/// async fn main() {
///     let store = LatestValueStore::new();
///     assert!(store.current().await.is_none());
///
///     store
///         .publish(WeightReading::new(Utc::now(), "RTW:0.650 kg", Some(0.65)))
///         .await;
///     assert_eq!(store.current().await.unwrap().weight, Some(0.65));
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LatestValueStore {
    inner: Arc<RwLock<Option<WeightReading>>>,
}

impl LatestValueStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite the slot with `reading`
    ///
    /// The prior value, if any, is discarded. This is called for every
    /// processed payload, including ones whose weight failed to parse.
    pub async fn publish(&self, reading: WeightReading) {
        let mut guard = self.inner.write().await;
        *guard = Some(reading);
    }

    /// Snapshot of the most recent reading
    ///
    /// `None` until the first publish.
    pub async fn current(&self) -> Option<WeightReading> {
        let guard = self.inner.read().await;
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_empty_before_first_publish() {
        let store = LatestValueStore::new();
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_then_current() {
        let store = LatestValueStore::new();

        let reading = WeightReading::new(Utc::now(), "RTW:0.650 kg", Some(0.65));
        store.publish(reading.clone()).await;

        assert_eq!(store.current().await, Some(reading));
    }

    #[tokio::test]
    async fn test_overwrite_discards_prior_value() {
        let store = LatestValueStore::new();

        store
            .publish(WeightReading::new(Utc::now(), "RTW:0.650 kg", Some(0.65)))
            .await;
        store
            .publish(WeightReading::new(Utc::now(), "garbage", None))
            .await;

        let current = store.current().await.unwrap();
        assert_eq!(current.message, "garbage");
        assert_eq!(current.weight, None);
    }

    #[tokio::test]
    async fn test_clones_share_one_slot() {
        let store = LatestValueStore::new();
        let other = store.clone();

        store
            .publish(WeightReading::new(Utc::now(), "1.282KG", Some(1.282)))
            .await;

        assert_eq!(other.current().await.unwrap().weight, Some(1.282));
    }

    #[tokio::test]
    async fn test_concurrent_publishers_leave_one_whole_value() {
        let store = LatestValueStore::new();
        let published: Vec<WeightReading> = (0..16)
            .map(|i| WeightReading::new(Utc::now(), format!("RTW:{i}.000 kg"), Some(i as f64)))
            .collect();

        let mut handles = Vec::new();
        for reading in published.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.publish(reading).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Exactly one of the published readings survives, untorn
        let current = store.current().await.unwrap();
        assert!(published.contains(&current));
    }
}
