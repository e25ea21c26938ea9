//! Telemetry records and the batching collector.

pub mod collector;
pub(crate) mod vitals;

pub use collector::Monitor;

use serde::{Deserialize, Serialize};

// ─── Wire records ────────────────────────────────────────────────
//
// Field names match the collection service's JSON contract; records
// are append-only and never mutated after construction.

/// One captured error, from an uncaught failure or an explicit
/// `track_error` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub url: String,
    /// RFC 3339 capture time.
    pub timestamp: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
}

/// One performance observation, e.g. `"LCP"` or `"DomContentLoaded"`.
/// `value` is milliseconds for timing metrics and unitless for scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    pub url: String,
    pub timestamp: String,
}

/// One user interaction, e.g. a `"pageView"` on a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInteraction {
    #[serde(rename = "type")]
    pub kind: String,
    pub element: String,
    pub url: String,
    pub timestamp: String,
}

/// Union of all three queues, submitted in one request on the reliable
/// teardown path (`{endpoint}/all`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedPayload {
    #[serde(default)]
    pub errors: Vec<ErrorReport>,
    #[serde(default)]
    pub metrics: Vec<PerformanceMetric>,
    #[serde(default)]
    pub interactions: Vec<UserInteraction>,
}

impl CombinedPayload {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.metrics.is_empty() && self.interactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.metrics.len() + self.interactions.len()
    }
}
