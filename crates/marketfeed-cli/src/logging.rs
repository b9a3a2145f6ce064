//! Subscriber setup for the `marketfeed` binary.
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `RUST_LOG` | any `EnvFilter` directive | unset |
//! | `LOG_LEVEL` | filter used when `RUST_LOG` is unset | `info` |
//! | `LOG_FORMAT` | `pretty`, `compact` | `compact` |
//! | `LOG_TARGET` | `true`, `false` | `false` |

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Output layout of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
}

impl LogFormat {
    /// Unrecognised values fall back to [`LogFormat::Compact`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub default_level: String,
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_level: String::from("info"),
            include_target: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            format: lookup("LOG_FORMAT")
                .map(|value| LogFormat::parse(&value))
                .unwrap_or(defaults.format),
            default_level: lookup("LOG_LEVEL")
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.default_level),
            include_target: lookup("LOG_TARGET")
                .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.include_target),
        }
    }

    /// Installs the global subscriber. Logs go to stderr so stdout stays
    /// free for command output.
    pub fn init(&self) -> Result<(), TryInitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_level));
        let registry = tracing_subscriber::registry().with(filter);

        match self.format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(self.include_target)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(self.include_target)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_case_insensitive_with_compact_fallback() {
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("json"), LogFormat::Compact);
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = LogConfig::from_lookup(|_| None);
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn variables_override_defaults() {
        let config = LogConfig::from_lookup(|key| match key {
            "LOG_FORMAT" => Some(String::from("pretty")),
            "LOG_LEVEL" => Some(String::from(" debug ")),
            "LOG_TARGET" => Some(String::from("true")),
            _ => None,
        });

        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.default_level, "debug");
        assert!(config.include_target);
    }

    #[test]
    fn blank_level_keeps_default() {
        let config = LogConfig::from_lookup(|key| (key == "LOG_LEVEL").then(String::new));
        assert_eq!(config.default_level, "info");
    }
}
