//! Configuration management for the Pathlock explorer.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/pathlock/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::PathStyle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_depth must be between 1 and 64, got {0}")]
    InvalidMaxDepth(usize),

    #[error("root_dir is not a directory: {0}")]
    InvalidRootDir(String),

    #[error("rules_file must not be empty")]
    EmptyRulesFile,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the explorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General explorer configuration.
    pub explorer: ExplorerConfig,

    /// Rule file configuration.
    pub rules: RulesConfig,

    /// Tree browsing configuration.
    pub browse: BrowseConfig,
}

/// General explorer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Directory the explorer is rooted at. Unset means the current directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Directory holding the lock files.
    pub data_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Rule file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule file; relative paths resolve against `data_dir`.
    pub rules_file: PathBuf,
}

/// Tree browsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowseConfig {
    /// List entries whose name starts with a dot.
    pub show_dotfiles: bool,

    /// Compare paths case-insensitively.
    pub case_insensitive: bool,

    /// Depth limit when rendering the whole tree.
    pub max_depth: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from("statements.txt"),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            show_dotfiles: false,
            case_insensitive: PathStyle::native() == PathStyle::Windows,
            max_depth: 8,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pathlock")
        .join("config.toml")
}

/// Returns the default data directory path.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pathlock")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - PATHLOCK_ROOT: Override the root directory
    /// - PATHLOCK_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Returns the names of the settings that were overridden. Nothing is
    /// logged here because logging is usually configured from the result.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Ok(root) = std::env::var("PATHLOCK_ROOT") {
            if !root.is_empty() {
                self.explorer.root_dir = Some(PathBuf::from(root));
                applied.push("root_dir");
            }
        }

        if let Ok(level) = std::env::var("PATHLOCK_LOG_LEVEL") {
            if !level.is_empty() {
                self.explorer.log_level = level;
                applied.push("log_level");
            }
        }
        applied
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browse.max_depth < 1 || self.browse.max_depth > 64 {
            return Err(ConfigError::InvalidMaxDepth(self.browse.max_depth));
        }

        if let Some(root) = &self.explorer.root_dir {
            if !root.is_dir() {
                return Err(ConfigError::InvalidRootDir(root.display().to_string()));
            }
        }

        if self.rules.rules_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRulesFile);
        }

        let level = self.explorer.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.explorer.log_level.clone()));
        }

        Ok(())
    }

    /// The directory to browse: the configured root if it is a directory,
    /// otherwise the current directory.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.explorer.root_dir {
            if root.is_dir() {
                return Ok(root.clone());
            }
            tracing::warn!(
                "Configured root {} is not a directory, using the current directory",
                root.display()
            );
        }
        std::env::current_dir().context("Failed to determine the current directory")
    }

    /// Location of the rule file.
    pub fn rules_path(&self) -> PathBuf {
        if self.rules.rules_file.is_absolute() {
            self.rules.rules_file.clone()
        } else {
            self.explorer.data_dir.join(&self.rules.rules_file)
        }
    }

    /// Path comparison style for the engine.
    pub fn path_style(&self) -> PathStyle {
        if self.browse.case_insensitive {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
