//! Thread-safe usage ledger.
//!
//! Keeps the most recent attempts plus running totals. Recording never
//! fails; poisoned locks are recovered.

use crate::model::{ModelUsage, TierUsage, UsageSummary};
use crate::pricing::PricingTable;
use chrono::{DateTime, Utc};
use daycoach_core::usage::{UsageEvent, UsageReporter};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

const DEFAULT_RETENTION: usize = 5_000;

pub struct UsageLedger {
    pricing: PricingTable,
    events: RwLock<VecDeque<UsageEvent>>,
    totals: RwLock<UsageSummary>,
    retention: usize,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::with_pricing(PricingTable::with_defaults())
    }

    pub fn with_pricing(pricing: PricingTable) -> Self {
        Self {
            pricing,
            events: RwLock::new(VecDeque::new()),
            totals: RwLock::new(UsageSummary::default()),
            retention: DEFAULT_RETENTION,
        }
    }

    /// Keep at most `retention` events for windowed queries. Running totals
    /// are unaffected.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn record(&self, event: UsageEvent) {
        {
            let mut totals = self.totals.write().unwrap_or_else(PoisonError::into_inner);
            accumulate(&mut totals, &event, &self.pricing);
        }

        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        if events.len() >= self.retention {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Retained events, oldest first.
    pub fn records(&self) -> Vec<UsageEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// The `limit` most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<UsageEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Running totals since the ledger was created.
    pub fn summary(&self) -> UsageSummary {
        let mut summary = self
            .totals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sort_models(&mut summary);
        summary
    }

    /// Totals over retained events with `from <= at <= to`.
    pub fn summary_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> UsageSummary {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let mut summary = UsageSummary {
            from: Some(from),
            to: Some(to),
            ..UsageSummary::default()
        };
        for event in events.iter().filter(|e| e.at >= from && e.at <= to) {
            accumulate(&mut summary, event, &self.pricing);
        }
        sort_models(&mut summary);
        summary
    }

    /// Drop retained events older than `cutoff`. Returns how many went.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let before = events.len();
        events.retain(|e| e.at >= cutoff);
        before - events.len()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageReporter for UsageLedger {
    fn report(&self, event: &UsageEvent) {
        tracing::debug!(
            model = %event.model,
            tier = %event.tier,
            success = event.success,
            fallback = event.fallback,
            latency_ms = event.latency_ms,
            "Model usage recorded"
        );
        self.record(event.clone());
    }
}

fn accumulate(summary: &mut UsageSummary, event: &UsageEvent, pricing: &PricingTable) {
    let latency_total = summary.avg_latency_ms * summary.calls + event.latency_ms;
    summary.calls += 1;
    summary.avg_latency_ms = latency_total / summary.calls;

    let tier = summary.by_tier.entry(event.tier).or_insert_with(TierUsage::default);
    tier.calls += 1;
    if !event.success {
        summary.failures += 1;
        tier.failures += 1;
    }
    if event.fallback {
        summary.fallbacks += 1;
        tier.fallbacks += 1;
    }

    let usage = event.usage.unwrap_or_default();
    let cost = pricing.compute_cost(&event.model, usage.prompt_tokens, usage.completion_tokens);
    summary.prompt_tokens += u64::from(usage.prompt_tokens);
    summary.completion_tokens += u64::from(usage.completion_tokens);
    summary.total_tokens += u64::from(usage.total_tokens);
    summary.estimated_cost_usd += cost;

    match summary.by_model.iter_mut().find(|m| m.model == event.model) {
        Some(model) => {
            model.calls += 1;
            model.prompt_tokens += u64::from(usage.prompt_tokens);
            model.completion_tokens += u64::from(usage.completion_tokens);
            model.cost_usd += cost;
        }
        None => summary.by_model.push(ModelUsage {
            model: event.model.clone(),
            calls: 1,
            prompt_tokens: u64::from(usage.prompt_tokens),
            completion_tokens: u64::from(usage.completion_tokens),
            cost_usd: cost,
        }),
    }
}

fn sort_models(summary: &mut UsageSummary) {
    summary
        .by_model
        .sort_by(|a, b| b.cost_usd.total_cmp(&a.cost_usd).then_with(|| a.model.cmp(&b.model)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use daycoach_core::provider::Usage;
    use daycoach_core::tier::Tier;
    use std::sync::Arc;

    fn event(model: &str, tier: Tier, success: bool, fallback: bool) -> UsageEvent {
        UsageEvent {
            model: model.into(),
            tier,
            success,
            fallback,
            usage: success.then_some(Usage {
                prompt_tokens: 1000,
                completion_tokens: 500,
                total_tokens: 1500,
            }),
            latency_ms: 100,
            at: Utc::now(),
        }
    }

    #[test]
    fn empty_ledger() {
        let ledger = UsageLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary(), UsageSummary::default());
    }

    #[test]
    fn record_updates_totals() {
        let ledger = UsageLedger::new();
        ledger.report(&event("anthropic/claude-sonnet-4", Tier::ProPlus, false, false));
        ledger.report(&event("openai/gpt-4o-mini", Tier::ProPlus, true, true));

        let summary = ledger.summary();
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.fallbacks, 1);
        assert_eq!(summary.total_tokens, 1500);
        assert_eq!(summary.avg_latency_ms, 100);

        let pro = summary.by_tier[&Tier::ProPlus];
        assert_eq!(pro, TierUsage { calls: 2, failures: 1, fallbacks: 1 });
        assert!(!summary.by_tier.contains_key(&Tier::Free));
    }

    #[test]
    fn cost_is_estimated_per_model() {
        let ledger = UsageLedger::new();
        ledger.record(event("anthropic/claude-sonnet-4", Tier::ProPlus, true, false));
        ledger.record(event("openai/gpt-4o-mini", Tier::Free, true, false));

        let summary = ledger.summary();
        // 0.0105 for sonnet plus 0.00045 for mini
        assert!((summary.estimated_cost_usd - 0.01095).abs() < 1e-10);
        assert_eq!(summary.by_model[0].model, "anthropic/claude-sonnet-4");
        assert_eq!(summary.by_model[1].model, "openai/gpt-4o-mini");
    }

    #[test]
    fn retention_bounds_records_not_totals() {
        let ledger = UsageLedger::new().with_retention(2);
        for _ in 0..5 {
            ledger.record(event("openai/gpt-4o", Tier::Premium, true, false));
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.summary().calls, 5);
    }

    #[test]
    fn recent_is_newest_first() {
        let ledger = UsageLedger::new();
        ledger.record(event("a", Tier::Free, true, false));
        ledger.record(event("b", Tier::Free, true, false));
        let recent = ledger.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].model, "b");
        assert_eq!(ledger.records()[0].model, "a");
    }

    #[test]
    fn summary_between_filters_by_time() {
        let ledger = UsageLedger::new();
        let mut old = event("openai/gpt-4o", Tier::Premium, true, false);
        old.at = Utc::now() - chrono::Duration::hours(2);
        ledger.record(old);
        ledger.record(event("openai/gpt-4o-mini", Tier::Free, true, false));

        let window = ledger.summary_between(Utc::now() - chrono::Duration::hours(1), Utc::now());
        assert_eq!(window.calls, 1);
        assert_eq!(window.by_model[0].model, "openai/gpt-4o-mini");
        assert!(window.from.is_some());
    }

    #[test]
    fn prune_old_events() {
        let ledger = UsageLedger::new();
        let mut old = event("m", Tier::Free, true, false);
        old.at = Utc::now() - chrono::Duration::days(3);
        ledger.record(old);
        ledger.record(event("m", Tier::Free, true, false));

        assert_eq!(ledger.prune_before(Utc::now() - chrono::Duration::days(1)), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn concurrent_reports() {
        let ledger = Arc::new(UsageLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        ledger.report(&event("openai/gpt-4o", Tier::Premium, true, false));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.summary().calls, 200);
    }
}
