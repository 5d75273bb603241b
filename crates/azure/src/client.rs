//! Key Vault REST client
//!
//! Fetches current secret versions from
//! `https://{vault}.vault.azure.net/secrets/{id}?api-version=7.4` using a
//! bearer token from the credential chain. No retries; failures map onto
//! [`SecretError`] kinds and propagate unchanged.

use crate::credentials::{AccessToken, TokenCredential};
use async_trait::async_trait;
use kvenv_secrets::{SecretError, SecretStore};
use reqwest::StatusCode;
use serde::Deserialize;

/// OAuth2 scope for Key Vault data-plane access.
pub const KEYVAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Key Vault REST API version used for secret reads.
const API_VERSION: &str = "7.4";

/// Secret payload returned by the Key Vault `GET /secrets/{name}` endpoint.
#[derive(Debug, Deserialize)]
struct SecretResponse {
    /// Absent for secrets that carry no value
    value: Option<String>,
}

/// A client bound to one vault with an already-acquired credential.
///
/// The vault base URL is derived deterministically from the vault name; no
/// other URL shapes are supported.
pub struct KeyVaultClient {
    http: reqwest::Client,
    vault_name: String,
    vault_url: String,
    token: AccessToken,
}

impl std::fmt::Debug for KeyVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultClient")
            .field("vault_name", &self.vault_name)
            .field("vault_url", &self.vault_url)
            .finish_non_exhaustive()
    }
}

impl KeyVaultClient {
    /// Authenticate through `credential` and bind the client to
    /// `vault_name`. Authentication happens exactly once, here.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Authentication`] when no credential source
    /// produces a token.
    pub async fn connect(
        vault_name: impl Into<String>,
        credential: &dyn TokenCredential,
    ) -> Result<Self, SecretError> {
        let vault_name = vault_name.into();
        let vault_url = Self::vault_url_for(&vault_name);

        tracing::debug!(vault = vault_name, "Authenticating against Key Vault");
        let token = credential.get_token(KEYVAULT_SCOPE).await?;

        // SAFETY: Client::builder().build() only fails on broken TLS backend
        // initialization, which default settings cannot trigger.
        #[allow(clippy::expect_used)]
        let http = reqwest::Client::builder()
            .user_agent("kvenv")
            .build()
            .expect("Failed to create HTTP client - TLS backend initialization failed");

        Ok(Self {
            http,
            vault_name,
            vault_url,
            token,
        })
    }

    /// Base URL for a vault: `https://{vault_name}.vault.azure.net`.
    #[must_use]
    pub fn vault_url_for(vault_name: &str) -> String {
        format!("https://{vault_name}.vault.azure.net")
    }

    /// Map a non-success response status onto the corresponding error kind.
    fn classify_status(&self, status: StatusCode, secret_id: &str) -> SecretError {
        match status {
            StatusCode::NOT_FOUND => SecretError::NotFound {
                name: secret_id.to_string(),
                vault: self.vault_name.clone(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SecretError::Authorization {
                name: secret_id.to_string(),
                status: status.as_u16(),
            },
            other => SecretError::Network {
                name: secret_id.to_string(),
                message: format!("Key Vault returned HTTP {other}"),
            },
        }
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret(&self, secret_id: &str) -> Result<Option<String>, SecretError> {
        let url = format!("{}/secrets/{secret_id}", self.vault_url);

        let response = self
            .http
            .get(&url)
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| SecretError::Network {
                name: secret_id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.classify_status(status, secret_id));
        }

        let secret: SecretResponse =
            response.json().await.map_err(|e| SecretError::Network {
                name: secret_id.to_string(),
                message: format!("malformed secret response: {e}"),
            })?;

        Ok(secret.value)
    }

    fn vault_name(&self) -> &str {
        &self.vault_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::DefaultCredentialChain;

    fn test_client() -> KeyVaultClient {
        KeyVaultClient {
            http: reqwest::Client::new(),
            vault_name: "kv1".to_string(),
            vault_url: KeyVaultClient::vault_url_for("kv1"),
            token: AccessToken::new("test-token".to_string()),
        }
    }

    #[test]
    fn vault_url_follows_fixed_template() {
        assert_eq!(
            KeyVaultClient::vault_url_for("kv1"),
            "https://kv1.vault.azure.net"
        );
    }

    #[test]
    fn status_404_maps_to_not_found() {
        let client = test_client();
        let err = client.classify_status(StatusCode::NOT_FOUND, "arm-tenant-id");
        assert!(matches!(
            err,
            SecretError::NotFound { ref name, ref vault } if name == "arm-tenant-id" && vault == "kv1"
        ));
    }

    #[test]
    fn status_401_and_403_map_to_authorization() {
        let client = test_client();
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = client.classify_status(status, "secret");
            assert!(matches!(err, SecretError::Authorization { .. }));
        }
    }

    #[test]
    fn status_5xx_maps_to_network() {
        let client = test_client();
        let err = client.classify_status(StatusCode::SERVICE_UNAVAILABLE, "secret");
        assert!(matches!(err, SecretError::Network { .. }));
    }

    #[test]
    fn secret_response_value_is_optional() {
        let with_value: SecretResponse =
            serde_json::from_str(r#"{"value": "s3cret", "id": "https://kv1.vault.azure.net/secrets/x/1"}"#)
                .unwrap();
        assert_eq!(with_value.value.as_deref(), Some("s3cret"));

        let without_value: SecretResponse =
            serde_json::from_str(r#"{"id": "https://kv1.vault.azure.net/secrets/x/1"}"#).unwrap();
        assert!(without_value.value.is_none());
    }

    #[tokio::test]
    async fn connect_propagates_authentication_failure() {
        // An empty chain can never authenticate; connect must fail before
        // any network request to the vault itself.
        let chain = DefaultCredentialChain::from_providers(vec![]);
        let err = KeyVaultClient::connect("kv1", &chain).await.unwrap_err();
        assert!(matches!(err, SecretError::Authentication { .. }));
    }
}
