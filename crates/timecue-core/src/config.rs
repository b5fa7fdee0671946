//! TOML-based application configuration.
//!
//! Stores:
//! - The time zone every "now" is anchored to, and the zones a user may switch to
//! - The timetable file location
//! - Notification throttling values
//! - Text-composition endpoint, model and retry budget
//!
//! Configuration is stored at `~/.config/timecue/config.toml`. The API key is
//! never written here; it is read from the environment variable named by
//! `llm.api_key_env`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::RetryPolicy;

/// Notification policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Minimum gap between check-ins; also the scheduler tick period.
    #[serde(default = "default_interval_seconds")]
    pub notification_interval_seconds: u64,
    /// Lead time before an upcoming task starts.
    #[serde(default = "default_minutes_before_task")]
    pub minutes_before_task: u32,
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes_after_start: u32,
    #[serde(default = "default_max_sleep_notifications")]
    pub max_sleep_notifications: u32,
    #[serde(default = "default_sleep_follow_up")]
    pub sleep_follow_up_interval_minutes: u32,
}

/// Text-composition configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Total attempts per composition.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-attempt network timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timecue/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// IANA time zone identifier.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Zones accepted by the `set_tz` console command.
    #[serde(default = "default_timezone_list")]
    pub timezone_list: Vec<String>,
    /// Timetable JSON file; relative paths resolve against the working directory.
    #[serde(default = "default_timetable_file")]
    pub timetable_file: PathBuf,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// Default functions
fn default_interval_seconds() -> u64 {
    1800
}
fn default_minutes_before_task() -> u32 {
    15
}
fn default_grace_minutes() -> u32 {
    2
}
fn default_max_sleep_notifications() -> u32 {
    2
}
fn default_sleep_follow_up() -> u32 {
    15
}
fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}
fn default_model() -> String {
    "meta-llama/llama-3-8b-instruct".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_timezone() -> String {
    "Asia/Kolkata".into()
}
fn default_timezone_list() -> Vec<String> {
    vec![
        "Asia/Kolkata".into(),
        "UTC".into(),
        "America/New_York".into(),
    ]
}
fn default_timetable_file() -> PathBuf {
    PathBuf::from("timetable.json")
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            notification_interval_seconds: default_interval_seconds(),
            minutes_before_task: default_minutes_before_task(),
            grace_minutes_after_start: default_grace_minutes(),
            max_sleep_notifications: default_max_sleep_notifications(),
            sleep_follow_up_interval_minutes: default_sleep_follow_up(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Retry policy derived from `retries` and `timeout_secs`.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retries,
            attempt_timeout: Duration::from_secs(self.timeout_secs),
            ..RetryPolicy::default()
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            timezone_list: default_timezone_list(),
            timetable_file: default_timetable_file(),
            notifications: NotificationsConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

/// Returns `~/.config/timecue[-dev]/` based on TIMECUE_ENV.
///
/// Set TIMECUE_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMECUE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timecue-dev")
    } else {
        base_dir.join("timecue")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DirUnavailable(e.to_string()))?;
    Ok(dir)
}

/// Parse an IANA time zone name.
///
/// # Errors
/// Returns an error naming `key` if the zone is unknown.
pub fn parse_timezone(key: &str, name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|e| invalid(e.to_string()))?,
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(|s| serde_json::Value::String(s.trim().to_string()))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, fails
    /// validation, or if defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::info!(path = %path.display(), "wrote default configuration");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_timezone("timezone", &self.timezone)?;
        for zone in &self.timezone_list {
            parse_timezone("timezone_list", zone)?;
        }

        let url = url::Url::parse(&self.llm.api_url).map_err(|e| ConfigError::InvalidValue {
            key: "llm.api_url".into(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                key: "llm.api_url".into(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.llm.retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.retries".into(),
                message: "at least one attempt is required".into(),
            });
        }
        if self.notifications.notification_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "notifications.notification_interval_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// The configured time zone.
    ///
    /// # Errors
    ///
    /// Returns an error if `timezone` is not a known IANA zone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        parse_timezone("timezone", &self.timezone)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// List values take a comma-separated string.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
