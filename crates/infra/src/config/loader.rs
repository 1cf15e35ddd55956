//! Configuration loader
//!
//! Loads pipeline configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `TAXBRIDGE_INTAKE_BASE_URL`: Intake service base URL
//! - `TAXBRIDGE_CLIENT_ID`: Client-credentials client id
//! - `TAXBRIDGE_CLIENT_SECRET`: Client-credentials secret
//!
//! Optional:
//! - `TAXBRIDGE_IDENTITY_BASE_URL`: Token endpoint host, defaults to the intake URL
//! - `TAXBRIDGE_SCOPE`: Token scope
//! - `TAXBRIDGE_REFRESH_THRESHOLD_SECS`: Renew this many seconds before expiry
//! - `TAXBRIDGE_REQUEST_TIMEOUT_SECS`: Per-request HTTP timeout
//! - `TAXBRIDGE_POLL_INTERVAL_SECS`: Wait before each status poll
//! - `TAXBRIDGE_POLL_MAX_ATTEMPTS`: Status poll budget per submission
//! - `TAXBRIDGE_POLL_HEURISTIC`: Enable the long-`InProgress` heuristic (true/false)
//! - `TAXBRIDGE_ENCODE_CONCURRENCY`: Concurrent encodes per batch
//! - `TAXBRIDGE_CACHE_TTL_SECS`: Customer cache time-to-live
//! - `TAXBRIDGE_CACHE_MAX_CAPACITY`: Customer cache size
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./taxbridge.toml`, `./taxbridge.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent directory
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use taxbridge_domain::{
    Config, CredentialsConfig, EncodingConfig, HeuristicConfig, IntakeConfig, PollingConfig,
    ReferenceCacheConfig, Result, TaxBridgeError,
};
use url::Url;

const CONFIG_FILE_NAMES: [&str; 4] =
    ["taxbridge.toml", "taxbridge.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `TaxBridgeError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `TAXBRIDGE_*` environment variables
///
/// # Errors
/// Returns `TaxBridgeError::Config` if required variables are missing
/// or any value is invalid.
pub fn load_from_env() -> Result<Config> {
    let defaults = PollingConfig::default();
    let heuristic =
        env_bool("TAXBRIDGE_POLL_HEURISTIC", true).then(HeuristicConfig::default);

    let config = Config {
        intake: IntakeConfig {
            base_url: env_var("TAXBRIDGE_INTAKE_BASE_URL")?,
            identity_base_url: std::env::var("TAXBRIDGE_IDENTITY_BASE_URL").ok(),
            request_timeout_secs: env_parse(
                "TAXBRIDGE_REQUEST_TIMEOUT_SECS",
                taxbridge_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
        },
        credentials: CredentialsConfig {
            client_id: env_var("TAXBRIDGE_CLIENT_ID")?,
            client_secret: env_var("TAXBRIDGE_CLIENT_SECRET")?,
            scope: std::env::var("TAXBRIDGE_SCOPE")
                .unwrap_or_else(|_| taxbridge_domain::constants::DEFAULT_TOKEN_SCOPE.to_string()),
            refresh_threshold_secs: env_parse(
                "TAXBRIDGE_REFRESH_THRESHOLD_SECS",
                taxbridge_domain::constants::DEFAULT_REFRESH_THRESHOLD_SECS,
            )?,
        },
        polling: PollingConfig {
            interval_secs: env_parse("TAXBRIDGE_POLL_INTERVAL_SECS", defaults.interval_secs)?,
            max_attempts: env_parse("TAXBRIDGE_POLL_MAX_ATTEMPTS", defaults.max_attempts)?,
            heuristic,
        },
        encoding: EncodingConfig {
            concurrency: env_parse(
                "TAXBRIDGE_ENCODE_CONCURRENCY",
                EncodingConfig::default().concurrency,
            )?,
            ..EncodingConfig::default()
        },
        reference_cache: ReferenceCacheConfig {
            ttl_secs: env_parse("TAXBRIDGE_CACHE_TTL_SECS", ReferenceCacheConfig::default().ttl_secs)?,
            max_capacity: env_parse(
                "TAXBRIDGE_CACHE_MAX_CAPACITY",
                ReferenceCacheConfig::default().max_capacity,
            )?,
        },
    };

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TaxBridgeError::Config` if the file is missing, malformed, or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TaxBridgeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TaxBridgeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TaxBridgeError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TaxBridgeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TaxBridgeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TaxBridgeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Reject values the pipeline cannot run with.
pub fn validate(config: &Config) -> Result<()> {
    check_url("intake.base_url", &config.intake.base_url)?;
    if let Some(identity) = &config.intake.identity_base_url {
        check_url("intake.identity_base_url", identity)?;
    }
    if config.credentials.client_id.trim().is_empty() {
        return Err(TaxBridgeError::Config("credentials.client_id is empty".into()));
    }
    if config.credentials.client_secret.is_empty() {
        return Err(TaxBridgeError::Config("credentials.client_secret is empty".into()));
    }
    if config.credentials.refresh_threshold_secs < 0 {
        return Err(TaxBridgeError::Config(
            "credentials.refresh_threshold_secs must not be negative".into(),
        ));
    }
    if config.polling.max_attempts == 0 {
        return Err(TaxBridgeError::Config("polling.max_attempts must be at least 1".into()));
    }
    if config.encoding.concurrency == 0 {
        return Err(TaxBridgeError::Config("encoding.concurrency must be at least 1".into()));
    }
    Ok(())
}

fn check_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| TaxBridgeError::Config(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(TaxBridgeError::Config(format!("{field} has unsupported scheme: {other}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current directory, its parent, then the executable's
/// directory. Returns the first file found.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
            dirs.push(exe_dir.join(".."));
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        TaxBridgeError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional variable parsed as `T`, `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| TaxBridgeError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
