//! Vault configuration loading
//!
//! Parses `config.toml` into a [`VaultConfig`]: the Key Vault name plus the
//! ordered mapping of logical secret names to vault-side secret identifiers.
//!
//! Expected shape:
//!
//! ```toml
//! [keyvault]
//! name = "my-vault"
//!
//! [secrets]
//! ARM_TENANT_ID = "arm-tenant-id"
//! ARM_CLIENT_ID = "arm-client-id"
//! ARM_CLIENT_SECRET = "arm-client-secret"
//! ```
//!
//! Every required field must be present; the loader performs no defaulting
//! and does not validate the secret identifiers themselves (that is the
//! vault client's concern).

use crate::ConfigError;
use std::path::{Path, PathBuf};
use toml::Table;

/// Default configuration file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Parsed vault configuration, immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Key Vault name (`keyvault.name`), never empty
    pub vault_name: String,
    /// Logical name -> vault secret identifier, in file order
    secrets: Vec<(String, String)>,
}

impl VaultConfig {
    /// Load the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingFile`] if `path` does not exist
    /// - [`ConfigError::Parse`] on malformed TOML or a non-string secret id
    /// - [`ConfigError::MissingKey`] if `keyvault.name` or the `[secrets]`
    ///   table is absent (or the name is empty)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents, path)
    }

    /// Parse configuration from a TOML string. `path` is used for error context only.
    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let table: Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let vault_name = table
            .get("keyvault")
            .and_then(toml::Value::as_table)
            .and_then(|kv| kv.get("name"))
            .and_then(toml::Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                key: "keyvault.name".to_string(),
            })?
            .to_string();

        let secrets_table = table
            .get("secrets")
            .and_then(toml::Value::as_table)
            .ok_or_else(|| ConfigError::MissingKey {
                key: "secrets".to_string(),
            })?;

        // `toml` is built with `preserve_order`, so iteration follows file order.
        let mut secrets = Vec::with_capacity(secrets_table.len());
        for (logical_name, value) in secrets_table {
            let secret_id = value.as_str().ok_or_else(|| ConfigError::Parse {
                path: path.to_path_buf(),
                message: format!("secret '{logical_name}' must be a string"),
            })?;
            secrets.push((logical_name.clone(), secret_id.to_string()));
        }

        if secrets.is_empty() {
            tracing::warn!(path = %path.display(), "No secrets configured; run will be a no-op");
        }

        Ok(Self {
            vault_name,
            secrets,
        })
    }

    /// Iterate `(logical_name, secret_id)` pairs in file order.
    pub fn secrets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.secrets
            .iter()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    /// Number of configured secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the secret mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Default path for the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}
