//! Configuration loading, validation, and management for gdpilot.
//!
//! Loads configuration from `~/.gdpilot/config.toml` with environment
//! variable overrides. Validates all settings at load time.
//!
//! Besides the typed fields, [`AppConfig::get`] and [`AppConfig::set`] expose
//! a flat string key-value surface (`endpoint`, `project.root`, ...) for UIs
//! that edit settings as text fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gdpilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completions URL, used verbatim
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer credential for the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request/response round trips allowed per user exchange
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: u32,

    /// Pause after announcing a tool call, so observers can render it
    #[serde(default = "default_tool_yield_ms")]
    pub tool_yield_ms: u64,

    /// HTTP timeout for one round trip
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Echo assistant reasoning back to the endpoint on later requests
    #[serde(default)]
    pub send_reasoning: bool,

    /// Project the file tools operate on
    #[serde(default)]
    pub project: ProjectConfig,

    /// External interpreter for script snippets
    #[serde(default)]
    pub script: ScriptConfig,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_round_trips() -> u32 {
    10
}
fn default_tool_yield_ms() -> u64 {
    50
}
fn default_request_timeout_secs() -> u64 {
    120
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_round_trips", &self.max_round_trips)
            .field("tool_yield_ms", &self.tool_yield_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("send_reasoning", &self.send_reasoning)
            .field("project", &self.project)
            .field("script", &self.script)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory that `res://` maps onto
    #[serde(default = "default_project_root")]
    pub root: PathBuf,

    /// JSON scene snapshot exported by the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_snapshot: Option<PathBuf>,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_project_root(),
            scene_snapshot: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Interpreter executable; script execution is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    /// Arguments placed before the snippet path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Every key accepted by [`AppConfig::get`] / [`AppConfig::set`].
pub const KEYS: &[&str] = &[
    "endpoint",
    "api_key",
    "model",
    "max_tokens",
    "max_round_trips",
    "tool_yield_ms",
    "request_timeout_secs",
    "send_reasoning",
    "project.root",
    "project.scene_snapshot",
    "script.program",
    "script.args",
];

impl AppConfig {
    /// Load configuration from the default path (~/.gdpilot/config.toml).
    ///
    /// Also checks environment variables:
    /// - `GDPILOT_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `GDPILOT_ENDPOINT`
    /// - `GDPILOT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("GDPILOT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.is_empty());
        }

        if let Ok(endpoint) = std::env::var("GDPILOT_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("GDPILOT_MODEL") {
            self.model = model;
        }
    }

    /// Load configuration from a specific file path, without env overrides.
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

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save to a specific path, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Get the configuration directory path.
    ///
    /// `GDPILOT_HOME` overrides the default `~/.gdpilot`.
    pub fn config_dir() -> PathBuf {
        match std::env::var("GDPILOT_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".gdpilot"),
        }
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        if self.max_round_trips == 0 {
            return Err(ConfigError::ValidationError("max_round_trips must be >= 1".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("request_timeout_secs must be > 0".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Read one setting as text. `None` for unset optional values.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "endpoint" => Some(self.endpoint.clone()),
            "api_key" => self.api_key.clone(),
            "model" => Some(self.model.clone()),
            "max_tokens" => Some(self.max_tokens.to_string()),
            "max_round_trips" => Some(self.max_round_trips.to_string()),
            "tool_yield_ms" => Some(self.tool_yield_ms.to_string()),
            "request_timeout_secs" => Some(self.request_timeout_secs.to_string()),
            "send_reasoning" => Some(self.send_reasoning.to_string()),
            "project.root" => Some(self.project.root.display().to_string()),
            "project.scene_snapshot" => self
                .project
                .scene_snapshot
                .as_ref()
                .map(|p| p.display().to_string()),
            "script.program" => self.script.program.clone(),
            "script.args" => Some(self.script.args.join(" ")),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Update one setting from text. An empty value clears optional settings.
    ///
    /// The change is validated; on error the config is left untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match key {
            "endpoint" => next.endpoint = value.to_string(),
            "api_key" => next.api_key = optional(value),
            "model" => next.model = value.to_string(),
            "max_tokens" => next.max_tokens = parse_value(key, value)?,
            "max_round_trips" => next.max_round_trips = parse_value(key, value)?,
            "tool_yield_ms" => next.tool_yield_ms = parse_value(key, value)?,
            "request_timeout_secs" => next.request_timeout_secs = parse_value(key, value)?,
            "send_reasoning" => next.send_reasoning = parse_value(key, value)?,
            "project.root" => next.project.root = PathBuf::from(value),
            "project.scene_snapshot" => next.project.scene_snapshot = optional(value).map(PathBuf::from),
            "script.program" => next.script.program = optional(value),
            "script.args" => {
                next.script.args = value.split_whitespace().map(String::from).collect()
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_round_trips: default_max_round_trips(),
            tool_yield_ms: default_tool_yield_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            send_reasoning: false,
            project: ProjectConfig::default(),
            script: ScriptConfig::default(),
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

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
