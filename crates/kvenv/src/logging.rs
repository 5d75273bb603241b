//! Logging bootstrap
//!
//! Resolves a logging configuration source and installs the process-wide
//! `tracing` subscriber before any other work runs. Resolution order:
//!
//! 1. the path named by the `LOGGING_CONFIG` environment variable, when set
//!    and non-empty;
//! 2. the caller-supplied default path (`logging-conf.yaml`);
//! 3. if neither file exists: a basic subscriber honouring `RUST_LOG`, else
//!    the caller-supplied fallback level.
//!
//! A missing config file is the expected fallback path, not an error; a
//! malformed one fails with a parse error.

use kvenv_core::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default logging configuration file, resolved relative to the working directory.
pub const DEFAULT_LOGGING_CONFIG_PATH: &str = "logging-conf.yaml";

/// Environment variable overriding the logging configuration file path.
pub const LOGGING_CONFIG_ENV: &str = "LOGGING_CONFIG";

/// Subscriber output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty-printed human-readable format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format
    Json,
}

/// Structured logging configuration, deserialized from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoggingSettings {
    /// Minimum severity (`trace` .. `error`)
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Per-target level overrides (`module_path: level`)
    #[serde(default)]
    pub targets: BTreeMap<String, String>,

    /// Emit timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Emit file/line source locations
    #[serde(default)]
    pub file_location: bool,
}

fn default_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

impl LoggingSettings {
    /// Build the `EnvFilter` directive string: global level first, then
    /// per-target overrides in stable (alphabetical) order.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.clone()];
        directives.extend(
            self.targets
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        );
        directives.join(",")
    }
}

/// Pick the logging config path: env override wins over the default.
#[must_use]
pub fn resolve_config_path(default_path: &str, env_key: &str) -> PathBuf {
    match std::env::var(env_key) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(default_path),
    }
}

/// Initialize process-wide logging. Safe to call at most once per process.
///
/// # Errors
///
/// - [`ConfigError::Parse`] when the resolved file exists but is not valid
///   YAML for [`LoggingSettings`]
/// - [`ConfigError::Io`] when the file exists but cannot be read
/// - [`ConfigError::LoggingInit`] when a subscriber is already installed
pub fn init_logging(
    default_path: &str,
    env_key: &str,
    fallback_level: Level,
) -> Result<(), ConfigError> {
    let path = resolve_config_path(default_path, env_key);

    if path.exists() {
        let settings = load_settings(&path)?;
        install_configured(&settings)
    } else {
        install_fallback(fallback_level)
    }
}

/// Parse [`LoggingSettings`] from a YAML file.
fn load_settings(path: &Path) -> Result<LoggingSettings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn init_error(e: impl std::fmt::Display) -> ConfigError {
    ConfigError::LoggingInit {
        message: e.to_string(),
    }
}

/// Install the subscriber described by a structured config.
fn install_configured(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(settings.filter_directives()).map_err(init_error)?;
    let registry = tracing_subscriber::registry().with(filter);

    let layer = tracing_subscriber::fmt::layer()
        .with_file(settings.file_location)
        .with_line_number(settings.file_location);

    match (settings.format, settings.timestamps) {
        (LogFormat::Pretty, true) => registry.with(layer.pretty()).try_init(),
        (LogFormat::Pretty, false) => registry.with(layer.pretty().without_time()).try_init(),
        (LogFormat::Compact, true) => registry.with(layer.compact()).try_init(),
        (LogFormat::Compact, false) => registry.with(layer.compact().without_time()).try_init(),
        (LogFormat::Json, true) => registry.with(layer.json()).try_init(),
        (LogFormat::Json, false) => registry.with(layer.json().without_time()).try_init(),
    }
    .map_err(init_error)
}

/// Install the basic subscriber: `RUST_LOG` when set, else the fallback level.
fn install_fallback(fallback_level: Level) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_level.to_string().to_lowercase()))
        .map_err(init_error)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(init_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_override_wins_over_default() {
        temp_env::with_var(LOGGING_CONFIG_ENV, Some("/etc/kvenv/logging.yaml"), || {
            let path = resolve_config_path(DEFAULT_LOGGING_CONFIG_PATH, LOGGING_CONFIG_ENV);
            assert_eq!(path, PathBuf::from("/etc/kvenv/logging.yaml"));
        });
    }

    #[test]
    fn empty_env_override_is_ignored() {
        temp_env::with_var(LOGGING_CONFIG_ENV, Some(""), || {
            let path = resolve_config_path(DEFAULT_LOGGING_CONFIG_PATH, LOGGING_CONFIG_ENV);
            assert_eq!(path, PathBuf::from(DEFAULT_LOGGING_CONFIG_PATH));
        });
    }

    #[test]
    fn unset_env_uses_default_path() {
        temp_env::with_var(LOGGING_CONFIG_ENV, None::<&str>, || {
            let path = resolve_config_path(DEFAULT_LOGGING_CONFIG_PATH, LOGGING_CONFIG_ENV);
            assert_eq!(path, PathBuf::from(DEFAULT_LOGGING_CONFIG_PATH));
        });
    }

    #[test]
    fn settings_parse_with_defaults() {
        let settings: LoggingSettings = serde_yaml::from_str("level: debug\n").unwrap();
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Pretty);
        assert!(settings.timestamps);
        assert!(!settings.file_location);
        assert!(settings.targets.is_empty());
    }

    #[test]
    fn settings_parse_full_config() {
        let settings: LoggingSettings = serde_yaml::from_str(
            "level: warn\nformat: json\ntimestamps: false\nfile-location: true\ntargets:\n  kvenv_azure: trace\n  hyper: error\n",
        )
        .unwrap();
        assert_eq!(settings.format, LogFormat::Json);
        assert!(!settings.timestamps);
        assert!(settings.file_location);
        assert_eq!(settings.targets.len(), 2);
    }

    #[test]
    fn filter_directives_include_targets() {
        let settings: LoggingSettings = serde_yaml::from_str(
            "level: info\ntargets:\n  hyper: warn\n  kvenv_secrets: debug\n",
        )
        .unwrap();
        assert_eq!(
            settings.filter_directives(),
            "info,hyper=warn,kvenv_secrets=debug"
        );
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "level: [unterminated\n").unwrap();
        let err = load_settings(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn init_without_config_file_installs_fallback() {
        // No file at the resolved path and no overrides: the basic
        // subscriber is installed at the fallback level without error.
        temp_env::with_vars(
            [(LOGGING_CONFIG_ENV, None::<&str>), ("RUST_LOG", None)],
            || {
                let result =
                    init_logging("no-such-logging-conf.yaml", LOGGING_CONFIG_ENV, Level::INFO);
                assert!(result.is_ok());
            },
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_yaml::from_str::<LoggingSettings>("level: info\nhandlers: {}\n")
            .unwrap_err();
        assert!(err.to_string().contains("handlers"));
    }
}
