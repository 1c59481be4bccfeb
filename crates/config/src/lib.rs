//! Configuration loading, validation, and management for DayCoach.
//!
//! Loads configuration from `~/.daycoach/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use daycoach_core::tier::{ModelConfig, Tier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.daycoach/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion provider connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Model selection per subscription tier
    #[serde(default)]
    pub models: TierModels,

    /// Context and response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Input filter settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Session history settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Optional TOML file with course days (used by the CLI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum_path: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Upper bound for a single chat request, fallback included
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openrouter".into()
}
fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            api_url: default_api_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierModels {
    #[serde(default = "default_free_model")]
    pub free: ModelConfig,
    #[serde(default = "default_premium_model")]
    pub premium: ModelConfig,
    #[serde(default = "default_pro_plus_model")]
    pub pro_plus: ModelConfig,
}

fn default_free_model() -> ModelConfig {
    ModelConfig::new("Free", "openai/gpt-4o-mini", 1000, 0.7)
}
fn default_premium_model() -> ModelConfig {
    ModelConfig::new("Premium", "openai/gpt-4o", 2000, 0.7)
}
fn default_pro_plus_model() -> ModelConfig {
    ModelConfig::new("Pro+", "anthropic/claude-sonnet-4", 4000, 0.7)
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            free: default_free_model(),
            premium: default_premium_model(),
            pro_plus: default_pro_plus_model(),
        }
    }
}

impl TierModels {
    pub fn for_tier(&self, tier: Tier) -> &ModelConfig {
        match tier {
            Tier::Free => &self.free,
            Tier::Premium => &self.premium,
            Tier::ProPlus => &self.pro_plus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an assembled learner context stays valid
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,

    /// How long a full assistant response stays valid
    #[serde(default = "default_response_ttl_secs")]
    pub response_ttl_secs: u64,

    /// Optional bound on cached responses. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_entries: Option<usize>,
}

fn default_context_ttl_secs() -> u64 {
    30
}
fn default_response_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: default_context_ttl_secs(),
            response_ttl_secs: default_response_ttl_secs(),
            max_response_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Maximum message length in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_max_length() -> usize {
    2000
}
fn default_locale() -> String {
    "ru".into()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            default_locale: default_locale(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How many past messages are replayed to the model
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_history_window() -> usize {
    10
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.daycoach/config.toml).
    ///
    /// Also checks environment variables:
    /// - `DAYCOACH_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `DAYCOACH_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.provider.api_key.is_none() {
            config.provider.api_key = std::env::var("DAYCOACH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("DAYCOACH_API_URL") {
            config.provider.api_url = url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".daycoach")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            let model = self.models.for_tier(tier);
            if model.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "models.{tier}.model must not be empty"
                )));
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "models.{tier}.temperature must be between 0.0 and 2.0"
                )));
            }
            if model.max_tokens == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "models.{tier}.max_tokens must be > 0"
                )));
            }
        }

        if self.cache.context_ttl_secs == 0 || self.cache.response_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache TTLs must be > 0".into(),
            ));
        }

        if self.filter.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "filter.max_length must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.request_timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            models: TierModels::default(),
            cache: CacheConfig::default(),
            filter: FilterConfig::default(),
            session: SessionConfig::default(),
            curriculum_path: None,
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter.max_length, 2000);
        assert_eq!(config.cache.context_ttl_secs, 30);
        assert_eq!(config.models.for_tier(Tier::Free).model, "openai/gpt-4o-mini");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.name, config.provider.name);
        assert_eq!(parsed.models.premium, config.models.premium);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.models.premium.temperature = 5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("models.premium.temperature"));
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut config = AppConfig::default();
        config.cache.response_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.name, "openrouter");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[models.free]
name = "Free"
model = "local/tiny"
max_tokens = 256
temperature = 0.2

[cache]
response_ttl_secs = 60
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.models.free.model, "local/tiny");
        assert_eq!(config.models.premium.model, "openai/gpt-4o");
        assert_eq!(config.cache.response_ttl_secs, 60);
        assert_eq!(config.cache.context_ttl_secs, 30);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache\nbroken").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter"));
        assert!(toml_str.contains("gpt-4o-mini"));
    }
}
