//! Configuration loading, validation, and logging setup for lorelens.
//!
//! Loads configuration from `~/.lorelens/config.toml` with environment
//! variable overrides. A missing file is not an error: the inspector runs
//! fine on defaults.

mod logging;

pub use logging::init_logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.lorelens/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoreLensConfig {
    /// How activations are classified and attached
    #[serde(default)]
    pub inspector: InspectorConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to do with entries whose lorebook matches none of the active
/// bindings (global, character, chat).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Show them, tagged as unclassified.
    #[default]
    Keep,
    /// Leave them out of the grouped output.
    Drop,
}

impl std::str::FromStr for UnmatchedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(UnmatchedPolicy::Keep),
            "drop" => Ok(UnmatchedPolicy::Drop),
            other => Err(ConfigError::ValidationError(format!(
                "unmatched policy must be \"keep\" or \"drop\", got \"{other}\""
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Key written into a message's `extra` map.
    #[serde(default = "default_attachment_key")]
    pub attachment_key: String,

    #[serde(default)]
    pub unmatched: UnmatchedPolicy,

    /// Treat "message rendered" as an arrival signal too, not only
    /// "message received".
    #[serde(default = "default_true")]
    pub attach_on_render: bool,
}

fn default_attachment_key() -> String {
    "worldInfoViewer".into()
}
fn default_true() -> bool {
    true
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            attachment_key: default_attachment_key(),
            unmatched: UnmatchedPolicy::default(),
            attach_on_render: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `lorelens_inspector=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoreLensConfig {
    /// Load configuration from the default path (~/.lorelens/config.toml).
    ///
    /// Environment variables override file values:
    /// - `LORELENS_UNMATCHED` (`keep` / `drop`)
    /// - `LORELENS_ATTACHMENT_KEY`
    /// - `LORELENS_LOG`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
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

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("LORELENS_UNMATCHED") {
            self.inspector.unmatched = policy.parse()?;
        }
        if let Some(key) = lookup("LORELENS_ATTACHMENT_KEY") {
            self.inspector.attachment_key = key;
        }
        if let Some(level) = lookup("LORELENS_LOG") {
            self.logging.level = level;
        }
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lorelens")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = &self.inspector.attachment_key;
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(
                "inspector.attachment_key must be non-empty and contain no whitespace".into(),
            ));
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "logging.level is not a valid filter directive: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
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

impl From<ConfigError> for lorelens_core::Error {
    fn from(e: ConfigError) -> Self {
        lorelens_core::Error::Config {
            message: e.to_string(),
        }
    }
}
