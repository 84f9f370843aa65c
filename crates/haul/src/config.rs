//! Client configuration.
//!
//! Values are layered with figment: built-in defaults, then a TOML file
//! (`haul.toml` in the working directory unless a path is given), then
//! `HAUL_`-prefixed environment variables. Nested keys use `__`, so
//! `HAUL_RETRY__MAX_ATTEMPTS=3` sets `retry.max_attempts`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use haul_transfer::{RetryConfig, TransportError};
use haul_verify::{ChecksumEngine, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "haul.toml";
pub const ENV_PREFIX: &str = "HAUL_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] TransportError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self { Self::Figment(Box::new(err)) }
}

/// Backoff settings as they appear in configuration files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts:  u32,
    pub base_delay_ms: u64,
    pub max_delay_ms:  u64,
    /// Overall budget per operation, unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts:  5,
            base_delay_ms: 1_000,
            max_delay_ms:  30_000,
            deadline_secs: None,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        let config = RetryConfig::default()
            .max_attempts(settings.max_attempts)
            .base_delay(Duration::from_millis(settings.base_delay_ms))
            .max_delay(Duration::from_millis(settings.max_delay_ms));
        match settings.deadline_secs {
            Some(secs) => config.deadline(Duration::from_secs(secs)),
            None => config,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the artifact API, e.g. `https://artifacts.example.com/api`.
    pub base_url:             String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token:                Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent:           Option<String>,
    pub connect_timeout_secs: u64,
    /// Per-attempt timeout covering the whole body. Zero disables it.
    pub request_timeout_secs: u64,
    /// Descriptors requested per list page.
    pub page_size:            u32,
    /// Ceiling for per-upload retention overrides.
    pub max_retention_days:   u32,
    /// Ceiling on the uncompressed size of an upload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes:     Option<u64>,
    pub compression_level:    u32,
    /// Read size used when digesting packages.
    pub chunk_size:           usize,
    /// Where archives are spooled before upload. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir:          Option<PathBuf>,
    pub retry:                RetrySettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url:             String::new(),
            token:                None,
            user_agent:           None,
            connect_timeout_secs: 30,
            request_timeout_secs: 300,
            page_size:            100,
            max_retention_days:   90,
            max_upload_bytes:     None,
            compression_level:    6,
            chunk_size:           DEFAULT_CHUNK_SIZE,
            staging_dir:          None,
            retry:                RetrySettings::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("page_size", &self.page_size)
            .field("max_retention_days", &self.max_retention_days)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("compression_level", &self.compression_level)
            .field("chunk_size", &self.chunk_size)
            .field("staging_dir", &self.staging_dir)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Provider stack: defaults, then `file` (or `haul.toml`), then the
    /// environment.
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> { Self::from_figment(Self::figment(file)) }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.base_url.trim().is_empty() {
            return invalid("base_url", "is required");
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return invalid("base_url", "must start with http:// or https://");
        }
        if !(1..=1000).contains(&self.page_size) {
            return invalid("page_size", "must be between 1 and 1000");
        }
        if self.max_retention_days == 0 {
            return invalid("max_retention_days", "must be positive");
        }
        if self.compression_level > 9 {
            return invalid("compression_level", "must be between 0 and 9");
        }
        if self.chunk_size == 0 {
            return invalid("chunk_size", "must be positive");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts", "must be at least 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return invalid("retry.base_delay_ms", "must not exceed retry.max_delay_ms");
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig { RetryConfig::from(&self.retry) }

    pub fn checksum_engine(&self) -> ChecksumEngine { ChecksumEngine::default().chunk_size(self.chunk_size) }

    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn staging_dir(&self) -> PathBuf { self.staging_dir.clone().unwrap_or_else(std::env::temp_dir) }

    /// Configuration as TOML with the token masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.token.is_some() {
            shown.token = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
    }
}
