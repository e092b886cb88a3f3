//! Logging setup for sift.
//!
//! Library code only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init`], which reads:
//!
//! - `SIFT_DEBUG=true|1|yes` - enable debug-level logging
//! - `SIFT_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `SIFT_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! Nothing is installed unless one of the first two is set. Installing a
//! subscriber requires the `tracing-subscriber` feature.
//!
//! ```rust,no_run
//! sift_query::logging::init();
//! ```
//!
//! Events emitted by the crates:
//!
//! - `debug` "compiled rule group" with rule and parameter counts
//! - `trace` "compiled rule" per leaf with field, operator and index
//! - `debug` per executed statement, `warn` when it exceeds the slow threshold

use std::env;
use std::sync::Once;

/// Enables debug logging when truthy.
pub const DEBUG_VAR: &str = "SIFT_DEBUG";
/// Explicit log level.
pub const LEVEL_VAR: &str = "SIFT_LOG_LEVEL";
/// Output format.
pub const FORMAT_VAR: &str = "SIFT_LOG_FORMAT";

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to JSON.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// `tracing` level name.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read settings from the environment. `None` means logging was not requested.
    pub fn from_env() -> Option<Self> {
        Self::resolve(
            env::var(DEBUG_VAR).ok().as_deref(),
            env::var(LEVEL_VAR).ok().as_deref(),
            env::var(FORMAT_VAR).ok().as_deref(),
        )
    }

    /// Resolve settings from raw variable values.
    pub fn resolve(debug: Option<&str>, level: Option<&str>, format: Option<&str>) -> Option<Self> {
        let debug = debug.is_some_and(is_truthy);
        if !debug && level.is_none() {
            return None;
        }

        let fallback = if debug { "debug" } else { "warn" };
        let level = match level.map(str::to_lowercase).as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };
        Some(Self {
            level,
            format: format.map(LogFormat::parse).unwrap_or_default(),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Check if `SIFT_DEBUG` is set to a truthy value.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).is_ok_and(|v| is_truthy(&v))
}

/// Install a global subscriber from the environment. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if let Some(settings) = LogSettings::from_env() {
            install(settings);
        }
    });
}

#[cfg(feature = "tracing-subscriber")]
fn install(settings: LogSettings) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = settings.level;
    let filter = EnvFilter::try_new(format!(
        "sift={level},sift_query={level},sift_sqlite={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };

    if installed.is_ok() {
        tracing::info!(level, format = ?settings.format, "sift logging initialized");
    }
}

#[cfg(not(feature = "tracing-subscriber"))]
fn install(_settings: LogSettings) {
    // Without the subscriber feature events reach whatever subscriber the host installs.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_requested() {
        assert_eq!(LogSettings::resolve(None, None, Some("pretty")), None);
        assert_eq!(LogSettings::resolve(Some("no"), None, None), None);
    }

    #[test]
    fn test_debug_flag_defaults_to_debug_level() {
        let settings = LogSettings::resolve(Some("TRUE"), None, None).unwrap();
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_explicit_level_and_format() {
        let settings = LogSettings::resolve(None, Some("Trace"), Some("compact")).unwrap();
        assert_eq!(settings.level, "trace");
        assert_eq!(settings.format, LogFormat::Compact);

        let settings = LogSettings::resolve(None, Some("loud"), None).unwrap();
        assert_eq!(settings.level, "warn");
    }
}
