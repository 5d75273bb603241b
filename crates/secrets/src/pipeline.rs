//! Sequential secret resolution
//!
//! One fetch per configured entry, in config-file order. The first failing
//! fetch aborts the whole pipeline and the store's error propagates
//! unchanged: no per-secret skip option, no partial success.

use crate::{SecretBundle, SecretError, SecretStore, SecureSecret};
use kvenv_core::VaultConfig;

/// Resolve every configured secret through `store`.
///
/// Returns the bundle as the primary result; mirroring values into the
/// process environment is a separate opt-in step
/// ([`SecretBundle::apply_to_process_env`]).
///
/// # Errors
///
/// Propagates the first [`SecretError`] the store reports.
pub async fn resolve_secrets<S: SecretStore + ?Sized>(
    config: &VaultConfig,
    store: &S,
) -> Result<SecretBundle, SecretError> {
    let mut bundle = SecretBundle::with_capacity(config.len());

    for (logical_name, secret_id) in config.secrets() {
        tracing::debug!(
            logical_name,
            secret_id,
            vault = store.vault_name(),
            "Fetching secret"
        );
        let value = store.get_secret(secret_id).await?;
        if value.is_none() {
            tracing::warn!(logical_name, secret_id, "Secret resolved without a value");
        }
        bundle.insert(logical_name.to_string(), value.map(SecureSecret::new));
    }

    tracing::info!(
        count = bundle.len(),
        vault = store.vault_name(),
        "Resolved secrets"
    );
    Ok(bundle)
}
