//! Model usage accounting for DayCoach.
//!
//! The [`UsageLedger`] receives one event per provider attempt from the
//! model router, keeps running totals per tier and per model, and estimates
//! spend with a small per-model pricing table.

pub mod engine;
pub mod model;
pub mod pricing;

pub use engine::UsageLedger;
pub use model::{ModelUsage, TierUsage, UsageSummary};
pub use pricing::{ModelPricing, PricingTable};
