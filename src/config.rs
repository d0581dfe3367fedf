//! Configuration file parser for ~/.config/friendfeed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{ATOM_MIME, RSS_MIME};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Set {} in environment.", TOKEN_ENV)]
    MissingToken,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The `Debug` impl masks `bearer_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API root including the version segment.
    pub api_base: String,

    /// Per-request timeout in seconds, for API pages and homepages alike.
    pub timeout_secs: u64,

    /// Homepages fetched concurrently per batch.
    pub batch_size: usize,

    /// `max_results` per following page (the API caps it at 1000).
    pub page_size: u32,

    /// `<link type>` values accepted as feeds.
    pub feed_types: Vec<String>,

    /// User-Agent sent with every request.
    pub user_agent: String,

    /// API bearer token (alternative to TWITTER_ACCESS_TOKEN env var).
    /// Env var takes precedence over config file.
    pub bearer_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2".to_string(),
            timeout_secs: 7,
            batch_size: 25,
            page_size: 1000,
            feed_types: vec![RSS_MIME.to_string(), ATOM_MIME.to_string()],
            user_agent: concat!("friendfeed/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("page_size", &self.page_size)
            .field("feed_types", &self.feed_types)
            .field("user_agent", &self.user_agent)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "api_base",
        "timeout_secs",
        "batch_size",
        "page_size",
        "feed_types",
        "user_agent",
        "bearer_token",
    ];

    /// Default location: `$HOME/.config/friendfeed/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("friendfeed")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// The result is not validated; call [`Config::validate`] once overrides
    /// have been applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), api_base = %config.api_base, "Loaded configuration");
        Ok(config)
    }

    /// Rejects values that would make a run meaningless or hang.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: format!("{} is outside 1..=1000", self.page_size),
            });
        }
        if self.feed_types.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "feed_types",
                reason: "at least one MIME type is required".to_string(),
            });
        }
        self.api_url()?;
        Ok(())
    }

    /// Parsed `api_base`.
    pub fn api_url(&self) -> Result<url::Url, ConfigError> {
        let url = url::Url::parse(&self.api_base).map_err(|e| ConfigError::Invalid {
            key: "api_base",
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "api_base",
                reason: "must be a hierarchical http(s) URL".to_string(),
            });
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Picks the bearer token: `env_token` (the value of [`TOKEN_ENV`]) wins
    /// over `bearer_token`. Blank values count as unset.
    pub fn resolve_bearer(&self, env_token: Option<&str>) -> Option<SecretString> {
        env_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.bearer_token
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
            })
            .map(|t| SecretString::from(t.to_owned()))
    }

    /// Like [`Config::resolve_bearer`], but a missing token is an error.
    pub fn require_bearer(&self, env_token: Option<&str>) -> Result<SecretString, ConfigError> {
        self.resolve_bearer(env_token).ok_or(ConfigError::MissingToken)
    }
}

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "TWITTER_ACCESS_TOKEN";

// ============================================================================
// Tests
// ============================================================================
