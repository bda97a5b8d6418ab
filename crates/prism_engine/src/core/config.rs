//! Engine configuration
//!
//! Configuration deserializes from TOML. Every section and field has a
//! default, so a partial file (or none at all) yields a working engine.

use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use crate::foundation::logging::LogConfig;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML or has wrong field types
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value is out of range or unrecognized
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: off, error, warn, info, debug, trace
    pub level: String,
    /// Write log lines to stderr
    pub console: bool,
    /// Use ANSI colors on the console sink
    pub color: bool,
    /// Include thread ids in formatted lines
    pub thread_ids: bool,
    /// Log file path; absent disables the file sink
    pub file: Option<PathBuf>,
    /// Rotate the log file past this many bytes
    pub max_file_size: u64,
    /// Drain log records on a dedicated thread
    pub async_mode: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let base = LogConfig::default();
        Self {
            level: "info".to_string(),
            console: base.console,
            color: base.color,
            thread_ids: base.thread_ids,
            file: None,
            max_file_size: base.max_file_size,
            async_mode: base.async_mode,
        }
    }
}

impl LoggingConfig {
    /// Parse the level string
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an unrecognized level name.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        match self.level.to_ascii_lowercase().as_str() {
            "off" => Ok(LevelFilter::Off),
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            other => Err(ConfigError::Invalid(format!(
                "unknown log level '{other}'"
            ))),
        }
    }

    /// Convert into the logger's config struct
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an unrecognized level name.
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        Ok(LogConfig {
            level: self.level_filter()?,
            console: self.console,
            color: self.color,
            thread_ids: self.thread_ids,
            file: self.file.clone(),
            max_file_size: self.max_file_size,
            async_mode: self.async_mode,
        })
    }
}

/// Async loader section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Worker thread count; 0 picks a count from available parallelism
    pub worker_threads: usize,
    /// Max GPU uploads drained per frame; 0 drains everything queued
    pub upload_budget: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            upload_budget: 8,
        }
    }
}

impl LoaderConfig {
    /// Budget in the form the upload drain expects
    #[must_use]
    pub fn budget(&self) -> Option<usize> {
        (self.upload_budget > 0).then_some(self.upload_budget)
    }
}

/// Renderer section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// RGBA clear color applied at the start of each frame
    pub clear_color: [f32; 4],
    /// Install the standard transform/camera/uniform/render systems on startup
    pub install_default_systems: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.05, 0.05, 0.08, 1.0],
            install_default_systems: true,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging section
    pub logging: LoggingConfig,
    /// Async loader section
    pub loader: LoaderConfig,
    /// Renderer section
    pub renderer: RendererConfig,
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the TOML is malformed or a value is
    /// out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check field values beyond what deserialization enforces
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.level_filter()?;
        if self.loader.worker_threads > 64 {
            return Err(ConfigError::Invalid(format!(
                "loader.worker_threads = {} exceeds the cap of 64",
                self.loader.worker_threads
            )));
        }
        for (i, channel) in self.renderer.clear_color.iter().enumerate() {
            if !(0.0..=1.0).contains(channel) {
                return Err(ConfigError::Invalid(format!(
                    "renderer.clear_color[{i}] = {channel} is outside 0.0..=1.0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.loader.upload_budget, 8);
        assert!(config.renderer.install_default_systems);
        assert_eq!(config.logging.level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [loader]
            worker_threads = 2

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.loader.worker_threads, 2);
        assert_eq!(config.loader.upload_budget, 8);
        assert_eq!(config.logging.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn bad_level_is_rejected() {
        let err = EngineConfig::from_toml_str("[logging]\nlevel = \"verbose\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn clear_color_must_be_normalized() {
        let err =
            EngineConfig::from_toml_str("[renderer]\nclear_color = [0.0, 0.0, 2.0, 1.0]")
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_budget_means_unlimited() {
        let config = EngineConfig::from_toml_str("[loader]\nupload_budget = 0").unwrap();
        assert_eq!(config.loader.budget(), None);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("[renderer\nclear_color = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
