//! Core types for kvenv
//!
//! Provides the `config.toml` loader ([`VaultConfig`]) and the shared
//! configuration error type ([`ConfigError`]) used across the kvenv crates.

pub mod config;
mod errors;

pub use config::VaultConfig;
pub use errors::ConfigError;

/// Result alias for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
