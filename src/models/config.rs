//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Admission pool and feed liveness settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Delivery retry settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Push gateway endpoint and credentials
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Audit trail settings
    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.pool_size == 0 {
            return Err(AppError::validation("dispatch.pool_size must be > 0"));
        }
        if self.dispatch.idle_timeout_secs == 0 {
            return Err(AppError::validation(
                "dispatch.idle_timeout_secs must be > 0",
            ));
        }
        if self.dispatch.admission_grace_secs == 0 {
            return Err(AppError::validation(
                "dispatch.admission_grace_secs must be > 0",
            ));
        }
        if self.notifier.max_attempts == 0 {
            return Err(AppError::validation("notifier.max_attempts must be > 0"));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(AppError::validation("gateway.timeout_secs must be > 0"));
        }
        if self.gateway.user_agent.trim().is_empty() {
            return Err(AppError::validation("gateway.user_agent is empty"));
        }
        url::Url::parse(&self.gateway.endpoint)?;
        if !self.notifier.dry_run && self.gateway.api_key.trim().is_empty() {
            return Err(AppError::validation(
                "gateway.api_key is required unless notifier.dry_run is set",
            ));
        }
        if self.audit.enabled && self.audit.capacity == 0 {
            return Err(AppError::validation("audit.capacity must be > 0"));
        }
        Ok(())
    }
}

/// Admission pool and feed liveness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum concurrent delivery tasks
    #[serde(default = "defaults::pool_size")]
    pub pool_size: usize,

    /// Seconds without an event before the feed is probed
    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Seconds an event may wait for a slot before the process gives up
    #[serde(default = "defaults::admission_grace")]
    pub admission_grace_secs: u64,
}

impl DispatchConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn admission_grace(&self) -> Duration {
        Duration::from_secs(self.admission_grace_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_size: defaults::pool_size(),
            idle_timeout_secs: defaults::idle_timeout(),
            admission_grace_secs: defaults::admission_grace(),
        }
    }
}

/// Delivery retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Attempt cap per event, including the first attempt
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step in seconds
    #[serde(default = "defaults::backoff_unit")]
    pub backoff_unit_secs: u64,

    /// Ask the gateway to validate without delivering
    #[serde(default)]
    pub dry_run: bool,
}

impl NotifierConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_secs(self.backoff_unit_secs)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_unit_secs: defaults::backoff_unit(),
            dry_run: false,
        }
    }
}

/// Push gateway endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// Server key sent as `Authorization: key=...`
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            api_key: String::new(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// JSON-lines file receiving audit entries
    #[serde(default = "defaults::audit_path")]
    pub path: String,

    /// Entries buffered before new ones are dropped
    #[serde(default = "defaults::audit_capacity")]
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            path: defaults::audit_path(),
            capacity: defaults::audit_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    // Dispatch defaults
    pub fn pool_size() -> usize {
        100
    }
    pub fn idle_timeout() -> u64 {
        60
    }
    pub fn admission_grace() -> u64 {
        300
    }

    // Notifier defaults
    pub fn max_attempts() -> u32 {
        10
    }
    pub fn backoff_unit() -> u64 {
        2
    }

    // Gateway defaults
    pub fn endpoint() -> String {
        "https://fcm.googleapis.com/fcm/send".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn user_agent() -> String {
        "catalog-fanout/0.1".into()
    }

    // Audit defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn audit_path() -> String {
        "audit.jsonl".into()
    }
    pub fn audit_capacity() -> usize {
        1024
    }

    pub fn level() -> String {
        "info".into()
    }
}
