//! Secret Resolution for kvenv
//!
//! Provides the narrow [`SecretStore`] contract implemented by vault
//! backends, secure in-memory secret types, and the sequential resolution
//! pipeline that turns a [`kvenv_core::VaultConfig`] into a
//! [`SecretBundle`].
//!
//! ```ignore
//! use kvenv_secrets::resolve_secrets;
//!
//! let bundle = resolve_secrets(&config, &store).await?;
//! bundle.apply_to_process_env();
//! ```
//!
//! Environment mutation is deliberately a separate step: the pipeline's
//! primary result is the bundle, and callers (tests in particular) can skip
//! the process-wide side effect.

mod pipeline;
mod types;

pub use pipeline::resolve_secrets;
pub use types::{SecretBundle, SecureSecret};

use async_trait::async_trait;
use thiserror::Error;

/// Error types for secret resolution.
///
/// These propagate unchanged from the vault backend through the pipeline:
/// no retries, no partial-success mode.
#[derive(Debug, Error)]
pub enum SecretError {
    /// No credential source in the chain produced a usable credential
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Accumulated per-provider failure detail
        message: String,
    },

    /// The secret (or the vault itself) does not exist
    #[error("Secret '{name}' not found in vault '{vault}'")]
    NotFound {
        /// Vault-side secret identifier
        name: String,
        /// Vault the lookup ran against
        vault: String,
    },

    /// The credential lacks permission for the secret
    #[error("Access denied for secret '{name}' (HTTP {status})")]
    Authorization {
        /// Vault-side secret identifier
        name: String,
        /// HTTP status returned by the service
        status: u16,
    },

    /// Connectivity or service fault
    #[error("Network error while fetching secret '{name}': {message}")]
    Network {
        /// Vault-side secret identifier
        name: String,
        /// Transport-level error detail
        message: String,
    },
}

/// Narrow contract over a vault backend: given a secret identifier, return
/// its current value or fail.
///
/// `Ok(None)` means the vault answered but the secret carries no value
/// ("null" secret); callers decide what that means. Implementations perform
/// no retries of their own.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current version of the named secret.
    async fn get_secret(&self, secret_id: &str) -> Result<Option<String>, SecretError>;

    /// Human-readable identifier of the backing vault, for log context.
    fn vault_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_carries_detail() {
        let err = SecretError::Authentication {
            message: "environment: AZURE_TENANT_ID not set; cli: az not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Authentication failed"));
        assert!(msg.contains("AZURE_TENANT_ID"));
    }

    #[test]
    fn not_found_error_names_secret_and_vault() {
        let err = SecretError::NotFound {
            name: "arm-client-id".to_string(),
            vault: "kv1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("arm-client-id"));
        assert!(msg.contains("kv1"));
    }

    #[test]
    fn authorization_error_includes_status() {
        let err = SecretError::Authorization {
            name: "arm-client-secret".to_string(),
            status: 403,
        };
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn network_error_includes_message() {
        let err = SecretError::Network {
            name: "token".to_string(),
            message: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("connection reset"));
    }
}
