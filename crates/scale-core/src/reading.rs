//! The weight reading value object
//!
//! One `WeightReading` is constructed per processed payload, whether or
//! not a numeric weight could be extracted from it. The JSON shape is the
//! wire contract of the query service and of the audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed physical unit tag for this deployment
pub const WEIGHT_UNIT: &str = "kg";

/// One parsed observation from the scale
///
/// Serializes as `{ "timestamp": ..., "message": ..., "weight": ...,
/// "weightUnit": ... }` with an ISO-8601 timestamp and `weight: null`
/// when parsing failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightReading {
    /// Receipt time (system clock, not sender-supplied)
    pub timestamp: DateTime<Utc>,

    /// Decoded, trimmed payload text exactly as received
    pub message: String,

    /// Extracted weight; `None` when the payload did not parse
    pub weight: Option<f64>,

    /// Unit tag, always [`WEIGHT_UNIT`] for this deployment
    pub weight_unit: String,
}

impl WeightReading {
    /// Create a reading with the fixed unit tag
    ///
    /// `message` must be non-empty after trimming; transports discard
    /// empty payloads before a reading is constructed.
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>, weight: Option<f64>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            weight,
            weight_unit: WEIGHT_UNIT.to_string(),
        }
    }
}
