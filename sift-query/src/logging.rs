//! Logging infrastructure for Sift.
//!
//! Structured logging through `tracing`, controlled by the `SIFT_DEBUG`
//! environment variable.
//!
//! # Environment Variables
//!
//! - `SIFT_DEBUG=true` - Enable debug logging (also `1` or `yes`)
//! - `SIFT_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `SIFT_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use sift_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! # Query log
//!
//! When enabled, every executed query is logged at `debug` with its
//! parameters rendered inline. The rendered text is for reading only; the
//! engine always receives the placeholder text and the parameter list.

use std::env;
use std::sync::{LazyLock, Once};

use regex_lite::{Captures, Regex};

use crate::filter::FilterValue;
use crate::traits::BoundQuery;

static INIT: Once = Once::new();

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?(\d+)").expect("placeholder pattern"));

/// Check if debug logging is enabled via the `SIFT_DEBUG` environment variable.
///
/// Returns `true` if `SIFT_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SIFT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `SIFT_LOG_LEVEL`.
///
/// Defaults to "debug" if `SIFT_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("SIFT_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `SIFT_LOG_FORMAT`.
///
/// Defaults to "json".
pub fn get_log_format() -> &'static str {
    env::var("SIFT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the Sift logging system.
///
/// Subsequent calls are no-ops. Nothing is installed unless `SIFT_DEBUG` or
/// `SIFT_LOG_LEVEL` is set, and only with the `tracing-subscriber` feature.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("SIFT_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!("sift={},sift_query={},sift_axum={}", level, level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "Sift logging initialized"
            );
        }
    });
}

/// Developer query log settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLogger {
    enabled: bool,
    pretty: bool,
}

impl QueryLogger {
    /// Create a logger with explicit settings.
    pub const fn new(enabled: bool, pretty: bool) -> Self {
        Self { enabled, pretty }
    }

    /// Enabled when `SIFT_DEBUG` is set; pretty output.
    pub fn from_env() -> Self {
        Self::new(is_debug_enabled(), true)
    }

    /// Whether queries are logged.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log a query about to be executed.
    pub fn log(&self, query: &BoundQuery) {
        if !self.enabled {
            return;
        }
        let text = if self.pretty {
            pretty_query(&query.text)
        } else {
            query.text.clone()
        };
        tracing::debug!(
            entity = %query.entity,
            params = query.params.len(),
            max_results = ?query.max_results,
            "Executing query:\n{}",
            render_bound(&text, &query.params)
        );
    }
}

impl Default for QueryLogger {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Log a query with the environment-driven settings.
pub fn log_query(query: &BoundQuery) {
    QueryLogger::from_env().log(query);
}

/// Replace `?N` placeholders with display renderings of their parameters.
///
/// Strings and temporal values are single-quoted with embedded quotes
/// doubled. Placeholders with no matching parameter are left as they are.
pub fn render_bound(text: &str, params: &[FilterValue]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let bound = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| params.get(i));
            match bound {
                Some(value) => display_literal(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn display_literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Null => "NULL".to_string(),
        FilterValue::String(_) | FilterValue::Date(_) | FilterValue::DateTime(_) => {
            format!("'{}'", escape_controls(&value.to_string().replace('\'', "''")))
        }
        other => other.to_string(),
    }
}

/// Escape control characters so a value cannot start a new log line.
fn escape_controls(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// Break query text into one clause per line.
///
/// A newline goes before `FROM`, `JOIN`, `LEFT JOIN`, `WHERE`, `ORDER BY`,
/// `AND` and `OR`; `AND`/`OR` lines are indented. The `AND` inside
/// `BETWEEN ?n AND ?m` does not break.
pub fn pretty_query(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = String::with_capacity(text.len() + 16);

    for (i, word) in words.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| words[p]);
        let next = words.get(i + 1).copied();

        let breaks = match *word {
            "FROM" | "WHERE" => true,
            "JOIN" => prev != Some("LEFT"),
            "LEFT" => next == Some("JOIN"),
            "ORDER" => next == Some("BY"),
            // The AND of a BETWEEN stays on its line.
            "AND" => i < 2 || words[i - 2] != "BETWEEN",
            "OR" => true,
            _ => false,
        };

        if i > 0 {
            if breaks {
                out.push('\n');
                if matches!(*word, "AND" | "OR") {
                    out.push_str("  ");
                }
            } else {
                out.push(' ');
            }
        }
        out.push_str(word);
    }

    out
}
