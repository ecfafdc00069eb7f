//! Process configuration: the JSON config file, environment variables, and the
//! retry-log override.
//!
//! Every setting resolves with the same precedence:
//!
//! 1. explicit programmatic override
//! 2. environment variable
//! 3. config file (`$ASC_CONFIG_PATH`, default `~/.asc/config.json`)
//! 4. built-in default

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AscError;

/// Environment variable pointing at the config file.
pub const ENV_CONFIG_PATH: &str = "ASC_CONFIG_PATH";
/// Environment variable enabling verbose retry logging.
pub const ENV_RETRY_LOG: &str = "ASC_RETRY_LOG";
/// Environment variable holding the maximum number of attempts for idempotent requests.
pub const ENV_MAX_ATTEMPTS: &str = "ASC_MAX_ATTEMPTS";
/// Environment variable holding the first backoff delay.
pub const ENV_BASE_DELAY: &str = "ASC_BASE_DELAY";
/// Environment variable holding the backoff ceiling.
pub const ENV_MAX_DELAY: &str = "ASC_MAX_DELAY";

/// Persisted configuration, typically `~/.asc/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Issuer id of the API key
    pub issuer_id: Option<String>,
    /// Key id of the API key
    pub key_id: Option<String>,
    /// Path to the `.p8` private key
    pub private_key_path: Option<PathBuf>,
    /// Maximum attempts for idempotent requests
    pub max_attempts: Option<u32>,
    /// First backoff delay, e.g. `"1s"`
    pub base_delay: Option<String>,
    /// Backoff ceiling, e.g. `"30s"`
    pub max_delay: Option<String>,
    /// Verbose retry logging
    pub retry_log: Option<bool>,
}

impl FileConfig {
    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AscError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| AscError::Config(format!("invalid config file {}: {e}", path.display())))
    }

    /// Load the config file from its default location.
    ///
    /// Returns `Ok(None)` when no file exists there.
    pub fn load_default() -> Result<Option<Self>, AscError> {
        let Some(path) = Self::default_path() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file found");
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// `$ASC_CONFIG_PATH`, or `~/.asc/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(ENV_CONFIG_PATH).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".asc").join("config.json"))
    }
}

const OVERRIDE_UNSET: u8 = 0;
const OVERRIDE_OFF: u8 = 1;
const OVERRIDE_ON: u8 = 2;

static RETRY_LOG_OVERRIDE: AtomicU8 = AtomicU8::new(OVERRIDE_UNSET);

/// Force retry logging on or off for the whole process, or clear the override
/// with `None`.
///
/// Meant to be called once at startup or from test setup, not while requests
/// are in flight.
pub fn set_retry_log_override(value: Option<bool>) {
    let raw = match value {
        None => OVERRIDE_UNSET,
        Some(false) => OVERRIDE_OFF,
        Some(true) => OVERRIDE_ON,
    };
    RETRY_LOG_OVERRIDE.store(raw, Ordering::SeqCst);
}

/// The current process-wide retry-log override.
pub fn retry_log_override() -> Option<bool> {
    match RETRY_LOG_OVERRIDE.load(Ordering::SeqCst) {
        OVERRIDE_OFF => Some(false),
        OVERRIDE_ON => Some(true),
        _ => None,
    }
}

/// Whether retry attempts should be logged at `warn` level.
pub fn retry_log_enabled(file: Option<&FileConfig>) -> bool {
    resolve_retry_log(retry_log_override(), |name| std::env::var(name).ok(), file)
}

pub(crate) fn resolve_retry_log<F>(
    override_value: Option<bool>,
    env: F,
    file: Option<&FileConfig>,
) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    override_value
        .or_else(|| env(ENV_RETRY_LOG).and_then(|v| parse_bool(&v)))
        .or_else(|| file.and_then(|f| f.retry_log))
        .unwrap_or(false)
}

/// Parse a boolean toggle such as `1`, `true`, `on`, `no`.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        "" => None,
        other => {
            tracing::warn!(value = other, "Ignoring unrecognized boolean setting");
            None
        }
    }
}

/// Parse a duration such as `500ms`, `2s` or `1m 30s`.
pub(crate) fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match humantime::parse_duration(value) {
        Ok(duration) => Some(duration),
        Err(e) => {
            tracing::warn!(value, error = %e, "Ignoring unparseable duration setting");
            None
        }
    }
}
