//! Configuration management for bracetag.
//!
//! Parses `bracetag.toml` configuration files with serde. Every section and
//! field is optional; missing values fall back to their defaults.
//!
//! ```toml
//! [markdown]
//! gfm = true
//!
//! [engine]
//! max_depth = 64
//! async_threads = 4
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Conventional configuration filename.
pub const CONFIG_FILENAME: &str = "bracetag.toml";

/// Default maximum nesting depth of open tags.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Upper bound for `engine.max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 4096;

/// Renderer configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown engine options.
    pub markdown: MarkdownConfig,
    /// Tag engine options.
    pub engine: EngineConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Markdown engine options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Enable GitHub Flavored Markdown (tables, strikethrough, task lists, alerts).
    pub gfm: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

/// Tag engine options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting depth of open tags. Opens beyond it render as text.
    pub max_depth: usize,
    /// Size of a dedicated thread pool for async handlers.
    ///
    /// When unset, async handlers run on the global rayon pool.
    pub async_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            async_threads: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist, and parse or
    /// validation errors for malformed content.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns parse or validation errors.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_depth = self.engine.max_depth;
        if max_depth == 0 {
            return Err(ConfigError::Validation(
                "engine.max_depth must be greater than 0".to_owned(),
            ));
        }
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "engine.max_depth cannot exceed {MAX_DEPTH_LIMIT}"
            )));
        }

        if self.engine.async_threads == Some(0) {
            return Err(ConfigError::Validation(
                "engine.async_threads must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}
