//! Configuration file parsing for `sift.toml`.
//!
//! ```toml
//! [sanitizer]
//! max_value_length = 120
//!
//! [debug]
//! log_queries = true
//! pretty_sql = false
//! ```

use std::path::Path;
use std::sync::LazyLock;

use miette::Diagnostic;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{QueryLogger, is_debug_enabled};
use crate::security::{DEFAULT_MAX_VALUE_LENGTH, Sanitizer};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern"));

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(sift::config::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(sift::config::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(sift::config::invalid_value))]
    InvalidValue { key: String, message: String },
}

/// Main configuration structure for `sift.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    /// Untrusted-input sanitizer settings.
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

impl SiftConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded).map_err(|e| ConfigError::TomlError { source: e })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.sanitizer.max_value_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sanitizer.max_value_length".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Sanitizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizerConfig {
    /// Values longer than this many characters are truncated.
    #[serde(default = "default_max_value_length")]
    pub max_value_length: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_value_length: default_max_value_length(),
        }
    }
}

impl SanitizerConfig {
    /// Build the configured sanitizer.
    pub fn build(&self) -> Sanitizer {
        Sanitizer::new().with_max_value_length(self.max_value_length)
    }
}

fn default_max_value_length() -> usize {
    DEFAULT_MAX_VALUE_LENGTH
}

/// Debug/logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every executed query.
    #[serde(default)]
    pub log_queries: bool,

    /// Pretty print logged queries.
    #[serde(default = "default_true")]
    pub pretty_sql: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            pretty_sql: true,
        }
    }
}

impl DebugConfig {
    /// Query log settings; `SIFT_DEBUG` also turns logging on.
    pub fn query_logger(&self) -> QueryLogger {
        QueryLogger::new(self.log_queries || is_debug_enabled(), self.pretty_sql)
    }
}

fn default_true() -> bool {
    true
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as they are.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    for cap in ENV_VAR.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
