//! Runtime configuration with documented defaults
//!
//! Every tunable value of the cache, the projector and the provider
//! orchestrator lives here. Values load from TOML; anything missing falls
//! back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::llm::context::DetailLevel;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyConfig {
    pub cache: CacheConfig,
    pub projection: ProjectionConfig,
    pub providers: ProvidersConfig,
}

/// Context cache limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of any entry, in milliseconds
    ///
    /// Entries older than this are treated as absent even when the object
    /// count still matches. Five minutes by default.
    pub ttl_ms: u64,

    /// Maximum number of resident snapshot entries
    pub max_snapshots: usize,

    /// Maximum number of resident projection entries
    ///
    /// Projections are cheaper to hold than to rebuild and there are several
    /// detail levels per scope, hence the larger bound.
    pub max_projections: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5 * 60 * 1000,
            max_snapshots: 10,
            max_projections: 50,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Projection sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Object count at which projection switches to parallel iteration
    pub parallel_threshold: usize,

    /// Radius used for the proximity map of the spatial detail level
    pub proximity_radius: f32,

    /// Level used when a caller does not ask for one
    pub default_level: DetailLevel,

    /// Cap on objects sent in the compact AI projection
    pub ai_max_objects: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 1000,
            proximity_radius: 500.0,
            default_level: DetailLevel::Standard,
            ai_max_objects: 100,
        }
    }
}

/// Wire format spoken by an HTTP provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// One configured HTTP provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub id: String,
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the API key; `None` for keyless local servers
    pub api_key_env: Option<String>,
    pub format: ApiFormat,
}

/// Provider selection and failover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Provider tried first on every call
    pub active: Option<String>,

    /// When false the first failure is returned to the caller unchanged
    pub fallback_enabled: bool,

    /// Failover sequence, independent of registration order
    pub fallback_order: Vec<String>,

    pub endpoints: Vec<ProviderEndpoint>,
}

/// Four enhanced backends by priority, then the local baseline
pub const DEFAULT_FALLBACK_ORDER: [&str; 5] = ["anthropic", "openai", "gemini", "deepseek", "ollama"];

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            active: None,
            fallback_enabled: true,
            fallback_order: DEFAULT_FALLBACK_ORDER.iter().map(|s| s.to_string()).collect(),
            endpoints: default_endpoints(),
        }
    }
}

fn default_endpoints() -> Vec<ProviderEndpoint> {
    vec![
        ProviderEndpoint {
            id: "anthropic".into(),
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-haiku-20240307".into(),
            api_key_env: Some("ANTHROPIC_API_KEY".into()),
            format: ApiFormat::Anthropic,
        },
        ProviderEndpoint {
            id: "openai".into(),
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            format: ApiFormat::OpenAI,
        },
        ProviderEndpoint {
            id: "gemini".into(),
            api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
                .into(),
            model: "gemini-1.5-flash".into(),
            api_key_env: Some("GEMINI_API_KEY".into()),
            format: ApiFormat::OpenAI,
        },
        ProviderEndpoint {
            id: "deepseek".into(),
            api_url: "https://api.deepseek.com/chat/completions".into(),
            model: "deepseek-chat".into(),
            api_key_env: Some("DEEPSEEK_API_KEY".into()),
            format: ApiFormat::OpenAI,
        },
        ProviderEndpoint {
            id: "ollama".into(),
            api_url: "http://localhost:11434/v1/chat/completions".into(),
            model: "llama3".into(),
            api_key_env: None,
            format: ApiFormat::OpenAI,
        },
    ]
}

impl GalaxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string and validate it
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: GalaxyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_snapshots == 0 || self.cache.max_projections == 0 {
            return Err(ConfigError::Invalid(
                "cache capacities must be at least 1".into(),
            ));
        }

        if !(self.projection.proximity_radius.is_finite() && self.projection.proximity_radius > 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "proximity_radius ({}) must be a positive number",
                self.projection.proximity_radius
            )));
        }

        let mut seen = ahash::AHashSet::new();
        for endpoint in &self.providers.endpoints {
            if !seen.insert(endpoint.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' is configured twice",
                    endpoint.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GalaxyConfig::default();
        assert_eq!(config.cache.max_snapshots, 10);
        assert_eq!(config.cache.max_projections, 50);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.projection.parallel_threshold, 1000);
        assert_eq!(config.providers.fallback_order.len(), 5);
        assert_eq!(config.providers.fallback_order[4], "ollama");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = GalaxyConfig::parse_toml(
            r#"
            [cache]
            ttl_ms = 1000

            [providers]
            active = "openai"
            fallback_enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_ms, 1000);
        assert_eq!(config.cache.max_snapshots, 10);
        assert_eq!(config.providers.active.as_deref(), Some("openai"));
        assert!(!config.providers.fallback_enabled);
        assert_eq!(config.projection.default_level, DetailLevel::Standard);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = GalaxyConfig::parse_toml("[cache]\nmax_snapshots = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip_keeps_active() {
        let mut config = GalaxyConfig::default();
        config.providers.active = Some("gemini".into());
        let text = config.to_toml().unwrap();
        let parsed = GalaxyConfig::parse_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
