//! Conduit Logging
//!
//! Every crate in the workspace logs through `tracing` macros with structured
//! fields. This crate turns the `CONDUIT_*` environment variables into a
//! `tracing-subscriber` registry so applications embedding the proxy get
//! consistent output without wiring a subscriber by hand.
//!
//! # Usage
//!
//! ```rust
//! // Reads CONDUIT_LOG_LEVEL / CONDUIT_LOG_FORMAT / CONDUIT_DEBUG
//! conduit_log::init();
//!
//! tracing::info!(route = "orders.get", "Proxy ready");
//! ```
//!
//! # Environment Variables
//!
//! - `CONDUIT_DEBUG=1` - Enable debug logging
//! - `CONDUIT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `CONDUIT_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `CONDUIT_LOG_COLOR=1|0` - Enable/disable ANSI colors
//! - `RUST_LOG` - Full `EnvFilter` directive, takes precedence over the level

use std::env;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level emitted by the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Whether to include the event target (module path)
    pub targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            color: false,
            targets: true,
        }
    }
}

impl LogConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Used by [`LogConfig::from_env`]; tests pass a map instead of mutating
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("CONDUIT_DEBUG").unwrap_or(false);

        let level = lookup("CONDUIT_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("CONDUIT_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = flag("CONDUIT_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && format != Format::Json);

        Self {
            level,
            format,
            color,
            targets: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Install a global subscriber configured from the environment.
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated calls harmless.
pub fn init() -> bool {
    init_with(&LogConfig::from_env())
}

/// Install a global subscriber using an explicit configuration.
pub fn init_with(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_ansi(config.color)
        .with_target(config.targets);

    let result = match config.format {
        Format::Pretty => builder.pretty().try_init(),
        Format::Compact => builder.compact().try_init(),
        #[cfg(feature = "json")]
        Format::Json => builder.json().try_init(),
        #[cfg(not(feature = "json"))]
        Format::Json => builder.compact().try_init(),
    };

    result.is_ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("Compact"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.format, Format::Json);
        assert!(!config.color);
    }

    #[test]
    fn test_debug_flag_lowers_level() {
        let config = LogConfig::from_lookup(lookup(&[("CONDUIT_DEBUG", "true")]));
        assert_eq!(config.level, Level::Debug);
    }

    #[test]
    fn test_explicit_level_wins_over_debug_flag() {
        let config = LogConfig::from_lookup(lookup(&[
            ("CONDUIT_DEBUG", "1"),
            ("CONDUIT_LOG_LEVEL", "error"),
        ]));
        assert_eq!(config.level, Level::Error);
    }

    #[test]
    fn test_color_follows_format_and_no_color() {
        let pretty = LogConfig::from_lookup(lookup(&[("CONDUIT_LOG_FORMAT", "pretty")]));
        assert!(pretty.color);

        let no_color = LogConfig::from_lookup(lookup(&[
            ("CONDUIT_LOG_FORMAT", "pretty"),
            ("NO_COLOR", "1"),
        ]));
        assert!(!no_color.color);

        let forced = LogConfig::from_lookup(lookup(&[("CONDUIT_LOG_COLOR", "1")]));
        assert!(forced.color);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig {
            format: Format::Compact,
            ..LogConfig::default()
        };
        let _ = init_with(&config);
        assert!(!init_with(&config));
    }
}
