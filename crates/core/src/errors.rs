//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while locating or parsing configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Configuration file not found: {path}")]
    MissingFile {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The configuration file exists but could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path of the offending file
        path: PathBuf,
        /// Parser error message
        message: String,
    },

    /// A required key or section is absent
    #[error("Missing required configuration key: {key}")]
    MissingKey {
        /// Dotted key path (e.g. `keyvault.name`)
        key: String,
    },

    /// Process-wide logging could not be initialized
    #[error("Failed to initialize logging: {message}")]
    LoggingInit {
        /// Subscriber installation error detail
        message: String,
    },

    /// The file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_message_names_path() {
        let err = ConfigError::MissingFile {
            path: PathBuf::from("/etc/kvenv/config.toml"),
        };
        assert!(err.to_string().contains("/etc/kvenv/config.toml"));
    }

    #[test]
    fn missing_key_message_names_key() {
        let err = ConfigError::MissingKey {
            key: "keyvault.name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required configuration key: keyvault.name"
        );
    }

    #[test]
    fn parse_message_includes_detail() {
        let err = ConfigError::Parse {
            path: PathBuf::from("config.toml"),
            message: "expected `=` after key".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("expected `=`"));
    }
}
