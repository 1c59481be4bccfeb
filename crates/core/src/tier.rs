//! Subscription tiers and the per-tier model configuration.

use serde::{Deserialize, Serialize};

/// Subscription level of a learner. Decides which model answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    ProPlus,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::ProPlus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::ProPlus => "pro_plus",
        }
    }

    /// The cheapest tier, used as the fallback target.
    pub fn is_cheapest(&self) -> bool {
        matches!(self, Tier::Free)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "pro_plus" | "pro-plus" | "proplus" => Ok(Tier::ProPlus),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// Static model settings for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Display name of the plan ("Free", "Premium", ...)
    pub name: String,
    /// Provider model id
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelConfig {
    pub fn new(name: &str, model: &str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_parses_common_spellings() {
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert_eq!("Premium".parse::<Tier>().unwrap(), Tier::Premium);
        assert_eq!("pro-plus".parse::<Tier>().unwrap(), Tier::ProPlus);
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn tier_serde_matches_display() {
        for tier in Tier::ALL {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{tier}\""));
        }
    }

    #[test]
    fn only_free_is_cheapest() {
        assert!(Tier::Free.is_cheapest());
        assert!(!Tier::Premium.is_cheapest());
        assert!(!Tier::ProPlus.is_cheapest());
    }
}
