//! # Logging Infrastructure
//!
//! Structured logging for the restore engine built on `tracing` and
//! `tracing-subscriber`.
//!
//! ## Overview
//!
//! - **Multiple output formats**: Pretty (development), JSON (production),
//!   Compact (CI logs)
//! - **Per-crate level filtering**: EnvFilter directives scoped to the
//!   workspace crates, with noisy dependencies capped at `warn`
//! - **Redaction helpers**: utilities for keeping credentials and local
//!   filesystem paths out of log output
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core_runtime::logging::{init_logging, LoggingConfig, LogFormat, LogLevel};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_level(LogLevel::Debug);
//!
//! init_logging(&config).expect("failed to initialize logging");
//! ```
//!
//! `init_logging` installs a global subscriber and can only succeed once per
//! process. Tests should rely on `tracing_subscriber::fmt::try_init()` style
//! setup instead of calling it repeatedly.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Error, Result};

// ============================================================================
// Configuration Types
// ============================================================================

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output with ANSI colors. Development default.
    Pretty,
    /// Newline-delimited JSON for log aggregation. Production default.
    Json,
    /// Single-line terse output suited to CI runs.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Minimum severity of records to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The directive string understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// Logging configuration.
///
/// Built with `with_*` methods from the default:
///
/// ```rust
/// use core_runtime::logging::{LoggingConfig, LogFormat, LogLevel};
///
/// let config = LoggingConfig::default()
///     .with_format(LogFormat::Compact)
///     .with_level(LogLevel::Warn)
///     .with_spans(true);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Minimum level for workspace crates.
    pub level: LogLevel,
    /// Explicit `EnvFilter` directive string. When set, overrides `level`
    /// and the built-in per-crate defaults.
    pub filter: Option<String>,
    /// Record span enter/exit events.
    pub enable_spans: bool,
    /// Include the event's module target in output.
    pub display_target: bool,
    /// Include thread ids and names in output.
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            filter: None,
            enable_spans: false,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    /// Sets the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the minimum level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets an explicit filter directive, e.g.
    /// `"core_restore=trace,backend_local=debug"`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit records.
    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    /// Controls whether the module target is shown.
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    /// Controls whether thread ids and names are shown.
    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initializes the global tracing subscriber.
///
/// Respects `RUST_LOG` when set; otherwise builds a filter from the
/// configured level scoped to the workspace crates, with `sqlx` capped at
/// `warn`.
///
/// # Errors
///
/// Returns `Error::Config` if a subscriber is already installed or the
/// filter directives fail to parse.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Pretty => init_pretty(config, filter),
        LogFormat::Json => init_json(config, filter),
        LogFormat::Compact => init_compact(config, filter),
    }
}

/// Builds the `EnvFilter` for the given configuration.
///
/// Priority: `RUST_LOG` environment variable, then `config.filter`, then
/// the per-crate defaults derived from `config.level`.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = config.level.as_str();
            format!(
                "core_runtime={level},core_restore={level},backend_traits={level},\
                 backend_local={level},sqlx=warn"
            )
        }
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn span_events(config: &LoggingConfig) -> fmt::format::FmtSpan {
    if config.enable_spans {
        fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE
    } else {
        fmt::format::FmtSpan::NONE
    }
}

fn init_pretty(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = fmt::layer()
        .pretty()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_span_events(span_events(config));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn init_json(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_span_events(span_events(config));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn init_compact(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = fmt::layer()
        .compact()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_span_events(span_events(config));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

// ============================================================================
// Redaction Helpers
// ============================================================================

/// Field names whose values must never reach log output.
const SENSITIVE_FIELDS: &[&str] = &[
    "passphrase",
    "password",
    "secret",
    "token",
    "api_key",
    "authorization",
    "encryption_key",
];

/// Returns `"[REDACTED]"` when the field name looks like a credential,
/// otherwise the value unchanged.
///
/// Use at call sites that log configuration or request data:
///
/// ```rust
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("passphrase", "hunter2"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("volume_name", "vault-b0001.zvol"), "vault-b0001.zvol");
/// ```
pub fn redact_if_sensitive<'a>(field_name: &str, value: &'a str) -> &'a str {
    let lowered = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|s| lowered.contains(s)) {
        "[REDACTED]"
    } else {
        value
    }
}

/// Reduces a filesystem path to its final component for logging.
///
/// Restore targets are user data; full paths stay out of the logs.
///
/// ```rust
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/home/alice/photos/cat.jpg"), "cat.jpg");
/// assert_eq!(strip_path("cat.jpg"), "cat.jpg");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert!(config.filter.is_none());
        assert!(!config.enable_spans);
        assert!(config.display_target);
        assert!(!config.display_thread_info);
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Warn)
            .with_filter("core_restore=trace")
            .with_spans(true)
            .with_target(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.filter.as_deref(), Some("core_restore=trace"));
        assert!(config.enable_spans);
        assert!(!config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_build_filter_default_directives() {
        let config = LoggingConfig::default().with_level(LogLevel::Info);
        // The generated directives must parse regardless of RUST_LOG.
        let directives = format!(
            "core_runtime={lvl},core_restore={lvl},backend_traits={lvl},\
             backend_local={lvl},sqlx=warn",
            lvl = config.level.as_str()
        );
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let config = LoggingConfig::default().with_filter("core_restore=notalevel");
        let result = build_filter(&config);
        if std::env::var("RUST_LOG").is_err() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_redact_sensitive_fields() {
        assert_eq!(redact_if_sensitive("passphrase", "hunter2"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("api_key", "abc123"), "[REDACTED]");
        assert_eq!(
            redact_if_sensitive("AUTHORIZATION", "Bearer x"),
            "[REDACTED]"
        );
        assert_eq!(redact_if_sensitive("backend_token", "tok"), "[REDACTED]");
    }

    #[test]
    fn test_redact_passes_ordinary_fields() {
        assert_eq!(
            redact_if_sensitive("volume_name", "vault-b1.zvol"),
            "vault-b1.zvol"
        );
        assert_eq!(redact_if_sensitive("size", "1024"), "1024");
    }

    #[test]
    fn test_strip_path_unix() {
        assert_eq!(
            strip_path("/var/backups/vault-b0001.zvol"),
            "vault-b0001.zvol"
        );
    }

    #[test]
    fn test_strip_path_windows() {
        assert_eq!(
            strip_path("C:\\backups\\vault-b0001.zvol"),
            "vault-b0001.zvol"
        );
    }

    #[test]
    fn test_strip_path_bare_name() {
        assert_eq!(strip_path("vault-b0001.zvol"), "vault-b0001.zvol");
    }

    #[test]
    fn test_serde_round_trip() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Error);
        let json = serde_json::to_string(&config).unwrap();
        let restored: LoggingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.format, LogFormat::Compact);
        assert_eq!(restored.level, LogLevel::Error);
    }
}
