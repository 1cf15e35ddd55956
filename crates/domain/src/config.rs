//! Configuration management

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENCODE_CONCURRENCY, DEFAULT_HEURISTIC_MIN_ATTEMPT, DEFAULT_HEURISTIC_REQUIRED_STREAK,
    DEFAULT_HEURISTIC_SUB_STATUS, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_MAX_ATTEMPTS,
    DEFAULT_REFERENCE_CACHE_MAX_CAPACITY, DEFAULT_REFERENCE_CACHE_TTL_SECS,
    DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOKEN_SCOPE,
};
use crate::types::DocumentFormat;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub intake: IntakeConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub reference_cache: ReferenceCacheConfig,
}

/// Remote intake service endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Base URL of the document submission API.
    pub base_url: String,
    /// Base URL of the identity service issuing tokens. Defaults to
    /// `base_url` when absent.
    #[serde(default)]
    pub identity_base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl IntakeConfig {
    pub fn identity_base_url(&self) -> &str {
        self.identity_base_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// OAuth2 client-credentials settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: i64,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .finish()
    }
}

/// Status polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
    /// Early-success shortcut for batches stuck in `InProgress`; `None`
    /// disables it.
    #[serde(default = "default_heuristic")]
    pub heuristic: Option<HeuristicConfig>,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            heuristic: default_heuristic(),
        }
    }
}

/// Trigger conditions for treating a long `InProgress` run as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Earliest attempt (1-based) at which the shortcut may fire.
    pub min_attempt: u32,
    /// Consecutive attempts on which every document must report
    /// `required_sub_status`.
    pub required_streak: u32,
    pub required_sub_status: String,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            min_attempt: DEFAULT_HEURISTIC_MIN_ATTEMPT,
            required_streak: DEFAULT_HEURISTIC_REQUIRED_STREAK,
            required_sub_status: DEFAULT_HEURISTIC_SUB_STATUS.to_string(),
        }
    }
}

/// Document encoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub format: DocumentFormat,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_ENCODE_CONCURRENCY, format: DocumentFormat::Json }
    }
}

/// Customer reference-data cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl ReferenceCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ReferenceCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_REFERENCE_CACHE_TTL_SECS,
            max_capacity: DEFAULT_REFERENCE_CACHE_MAX_CAPACITY,
        }
    }
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_scope() -> String {
    DEFAULT_TOKEN_SCOPE.to_string()
}

fn default_refresh_threshold() -> i64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_poll_attempts() -> u32 {
    DEFAULT_POLL_MAX_ATTEMPTS
}

fn default_heuristic() -> Option<HeuristicConfig> {
    Some(HeuristicConfig::default())
}

fn default_concurrency() -> usize {
    DEFAULT_ENCODE_CONCURRENCY
}

fn default_cache_ttl() -> u64 {
    DEFAULT_REFERENCE_CACHE_TTL_SECS
}

fn default_cache_capacity() -> u64 {
    DEFAULT_REFERENCE_CACHE_MAX_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
        [intake]
        base_url = "https://preprod-api.example.gov"

        [credentials]
        client_id = "client"
        client_secret = "s3cret"
    "#;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: Config = toml::from_str(MINIMAL_TOML).unwrap();

        assert_eq!(config.intake.identity_base_url(), "https://preprod-api.example.gov");
        assert_eq!(config.credentials.refresh_threshold_secs, 300);
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.heuristic.as_ref().map(|h| h.min_attempt), Some(9));
        assert_eq!(config.encoding.concurrency, 5);
    }

    #[test]
    fn debug_redacts_client_secret() {
        let config: Config = toml::from_str(MINIMAL_TOML).unwrap();
        let rendered = format!("{:?}", config.credentials);

        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn secret_is_never_serialized() {
        let config: Config = toml::from_str(MINIMAL_TOML).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn heuristic_can_be_disabled_explicitly() {
        let json = r#"{"interval_secs": 1, "max_attempts": 3, "heuristic": null}"#;
        let polling: PollingConfig = serde_json::from_str(json).unwrap();
        assert!(polling.heuristic.is_none());
    }
}
