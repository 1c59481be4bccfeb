//! Usage summary types served by the ledger.

use chrono::{DateTime, Utc};
use daycoach_core::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Call counts for one requested tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierUsage {
    pub calls: u64,
    pub failures: u64,
    /// Attempts served by the free-tier fallback.
    pub fallbacks: u64,
}

/// Tokens and estimated spend for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

/// Aggregate over a window of recorded attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub calls: u64,
    pub failures: u64,
    pub fallbacks: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    pub avg_latency_ms: u64,
    pub by_tier: BTreeMap<Tier, TierUsage>,
    /// Sorted by spend, highest first.
    pub by_model: Vec<ModelUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl UsageSummary {
    /// Share of attempts that failed, 0.0 when nothing was recorded.
    pub fn failure_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.failures as f64 / self.calls as f64
        }
    }
}
