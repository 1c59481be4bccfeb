//! Per-model pricing used to estimate spend.
//!
//! Prices are USD per one million tokens. Only the models the default tier
//! table routes to are built in; others can be added with [`PricingTable::with_price`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_m: f64,
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (f64::from(input_tokens) * self.input_per_m + f64::from(output_tokens) * self.output_per_m)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_price("openai/gpt-4o-mini", ModelPricing::new(0.15, 0.6))
            .with_price("openai/gpt-4o", ModelPricing::new(2.5, 10.0))
            .with_price("anthropic/claude-sonnet-4", ModelPricing::new(3.0, 15.0))
    }

    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    pub fn with_price(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.prices.insert(model.into(), pricing);
        self
    }

    /// Pricing for `model`.
    ///
    /// Tries an exact match, then the bare name without a vendor prefix, then
    /// the longest known bare name that prefixes it (`gpt-4o-mini-2024-07-18`
    /// resolves to `gpt-4o-mini`).
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        if let Some(p) = self.prices.get(model) {
            return Some(*p);
        }

        let bare = bare_name(model).to_lowercase();
        self.prices
            .iter()
            .filter(|(key, _)| bare.starts_with(&bare_name(key).to_lowercase()))
            .max_by_key(|(key, _)| bare_name(key).len())
            .map(|(_, p)| *p)
    }

    /// Estimated cost of a call; 0.0 for unknown models.
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.get(model)
            .map(|p| p.cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn bare_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}
