//! Configuration loading, validation, and management for Vigil.
//!
//! Loads configuration from `~/.vigil/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vigil_security::SafetyGate;

/// The root configuration structure.
///
/// Maps directly to `~/.vigil/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default model, e.g. "llama3.1:8b". When unset, callers must
    /// select one before chatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Sampling temperature for security analysis (kept low on purpose)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Model provider endpoint
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Command execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Destructive-command gate settings
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Diagnostic tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_temperature() -> f32 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Ollama base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-attempt wall-clock deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-stream capture cap in bytes
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Extra attempts after the first failure
    #[serde(default)]
    pub retries: u32,

    /// Backoff base; sleep is `retry_backoff^(attempt - 1)` seconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff: f64,

    /// Whether spawn failures consume retry attempts
    #[serde(default = "default_true")]
    pub retry_spawn_errors: bool,
}

fn default_timeout_secs() -> u64 {
    300
}
fn default_max_output_bytes() -> usize {
    500_000
}
fn default_retry_backoff() -> f64 {
    2.0
}
fn default_true() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            retries: 0,
            retry_backoff: default_retry_backoff(),
            retry_spawn_errors: true,
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Downgrade dangerous commands from blocked to confirm-first
    #[serde(default)]
    pub allow_destructive: bool,

    /// Require the human "YES" before overridden commands run
    #[serde(default = "default_true")]
    pub require_confirmation: bool,

    /// Extra dangerous-command regexes, checked after the built-ins
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            allow_destructive: false,
            require_confirmation: true,
            additional_patterns: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Deadline for model-requested terminal commands, in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Conversational truncation cap for tool output, in characters
    #[serde(default = "default_max_tool_output_chars")]
    pub max_tool_output_chars: usize,

    /// Log directories to scan. Empty = platform defaults.
    #[serde(default)]
    pub log_dirs: Vec<String>,

    /// How many most-recently-modified log files to report
    #[serde(default = "default_log_file_limit")]
    pub log_file_limit: usize,

    /// Lines tailed from each log file
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_max_tool_output_chars() -> usize {
    4_000
}
fn default_log_file_limit() -> usize {
    8
}
fn default_tail_lines() -> usize {
    200
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            max_tool_output_chars: default_max_tool_output_chars(),
            log_dirs: vec![],
            log_file_limit: default_log_file_limit(),
            tail_lines: default_tail_lines(),
        }
    }
}

impl ToolsConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.vigil/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `VIGIL_MODEL` — default model
    /// - `VIGIL_OLLAMA_URL` — provider base URL
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(model) = std::env::var("VIGIL_MODEL") {
            config.default_model = Some(model);
        }
        if let Ok(url) = std::env::var("VIGIL_OLLAMA_URL") {
            config.provider.base_url = url;
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
        dirs_home().join(".vigil")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.executor.retry_backoff < 0.0 {
            return Err(ConfigError::ValidationError(
                "executor.retry_backoff must be >= 0".into(),
            ));
        }

        SafetyGate::with_extra_patterns(&self.safety.additional_patterns)
            .map_err(|e| ConfigError::ValidationError(format!("safety.additional_patterns: {e}")))?;

        Ok(())
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            temperature: default_temperature(),
            provider: ProviderConfig::default(),
            executor: ExecutorConfig::default(),
            safety: SafetyConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
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

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.default_model.is_none());
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.provider.base_url, "http://localhost:11434");
        assert_eq!(config.executor.timeout_secs, 300);
        assert_eq!(config.executor.retries, 0);
        assert_eq!(config.gateway.port, 5000);
        assert!(config.safety.require_confirmation);
        assert!(!config.safety.allow_destructive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.temperature, config.temperature);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.executor.max_output_bytes, 500_000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
default_model = "llama3.1:8b"

[executor]
retries = 2
retry_backoff = 1.5

[safety]
allow_destructive = true
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("llama3.1:8b"));
        assert_eq!(config.executor.retries, 2);
        assert_eq!(config.executor.retry_backoff, 1.5);
        assert_eq!(config.executor.timeout_secs, 300);
        assert!(config.safety.allow_destructive);
        assert!(config.safety.require_confirmation);
        assert_eq!(config.tools.tool_timeout_secs, 30);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_extra_pattern_rejected() {
        let mut config = AppConfig::default();
        config.safety.additional_patterns.push("[unclosed".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("additional_patterns"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().gateway.port, 5000);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = \"mistral\"\n[gateway]\nport = 8080\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("mistral"));
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = [not toml").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("11434"));
        assert!(toml_str.contains("5000"));
        assert!(toml_str.contains("require_confirmation"));
    }

    #[test]
    fn timeout_helpers_convert_to_duration() {
        let config = AppConfig::default();
        assert_eq!(config.executor.timeout(), Duration::from_secs(300));
        assert_eq!(config.tools.tool_timeout(), Duration::from_secs(30));
    }
}
