//! Usage reporting for model calls.
//!
//! The model router emits one [`UsageEvent`] per provider attempt. Reporting
//! is a side effect and never influences the call result.

use crate::provider::Usage;
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One provider attempt as seen by analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Model the attempt was sent to.
    pub model: String,
    /// Tier the caller requested (unchanged by fallback).
    pub tier: Tier,
    pub success: bool,
    /// Whether this attempt was the free-tier fallback.
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub latency_ms: u64,
    pub at: DateTime<Utc>,
}

/// Sink for usage events.
pub trait UsageReporter: Send + Sync {
    fn report(&self, event: &UsageEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl UsageReporter for NoopReporter {
    fn report(&self, _event: &UsageEvent) {}
}
