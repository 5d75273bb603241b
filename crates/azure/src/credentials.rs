//! Credential provider chain for Azure
//!
//! Each provider is a strategy exposing [`TokenCredential::get_token`];
//! [`DefaultCredentialChain`] tries them in fixed priority order and
//! returns the first token obtained. Providers perform no retries and
//! no caching of their own.

use async_trait::async_trait;
use kvenv_secrets::{SecretError, SecureSecret};
use serde::Deserialize;
use tokio::process::Command;

/// Entra ID token endpoint template for the client-credentials grant.
const LOGIN_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Azure Instance Metadata Service token endpoint (managed identity).
const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// A bearer token obtained from a credential provider.
///
/// The token value is held in secure storage and redacted from Debug output.
#[derive(Clone, Debug)]
pub struct AccessToken {
    token: SecureSecret,
}

impl AccessToken {
    /// Wrap a raw bearer token.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SecureSecret::new(token),
        }
    }

    /// Expose the raw token for use in an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.token.expose()
    }
}

/// A single credential source that may or may not be able to produce a
/// token in the current environment.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Provider identifier used in chain failure messages.
    fn name(&self) -> &'static str;

    /// Attempt to obtain a token for `scope`
    /// (e.g. `https://vault.azure.net/.default`).
    async fn get_token(&self, scope: &str) -> Result<AccessToken, SecretError>;
}

/// Successful token response from the OAuth2 / IMDS endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Error response from the OAuth2 token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn auth_error(provider: &str, message: impl std::fmt::Display) -> SecretError {
    SecretError::Authentication {
        message: format!("{provider}: {message}"),
    }
}

/// Convert an OAuth2 scope to the resource form used by IMDS and the CLI
/// (`https://vault.azure.net/.default` -> `https://vault.azure.net`).
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Service-principal credential from environment variables.
///
/// Reads `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` and
/// performs an OAuth2 `client_credentials` grant against Entra ID.
#[derive(Debug, Default)]
pub struct EnvironmentCredential;

impl EnvironmentCredential {
    /// Create a new environment credential.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn required_var(name: &str) -> Result<String, SecretError> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| auth_error("environment", format!("{name} not set")))
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, SecretError> {
        let tenant_id = Self::required_var("AZURE_TENANT_ID")?;
        let client_id = Self::required_var("AZURE_CLIENT_ID")?;
        let client_secret = Self::required_var("AZURE_CLIENT_SECRET")?;

        let url = format!("{LOGIN_AUTHORITY}/{tenant_id}/oauth2/v2.0/token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", scope),
        ];

        tracing::debug!(%url, client_id, "Requesting service principal token");

        let response = reqwest::Client::new()
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| auth_error("environment", format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<TokenErrorResponse>()
                .await
                .map_or_else(
                    |_| format!("HTTP {status}"),
                    |err| {
                        err.error_description
                            .unwrap_or_else(|| format!("{} (HTTP {status})", err.error))
                    },
                );
            return Err(auth_error("environment", detail));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error("environment", format!("malformed token response: {e}")))?;

        Ok(AccessToken::new(token.access_token))
    }
}

/// Managed identity credential via the Instance Metadata Service.
///
/// Only useful when the process runs inside Azure; elsewhere the IMDS
/// endpoint is unreachable and the provider fails, letting the chain move on.
#[derive(Debug, Default)]
pub struct ManagedIdentityCredential;

impl ManagedIdentityCredential {
    /// Create a new managed identity credential.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed-identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, SecretError> {
        let resource = scope_to_resource(scope);

        let response = reqwest::Client::new()
            .get(IMDS_TOKEN_ENDPOINT)
            .header("Metadata", "true")
            .query(&[("api-version", "2018-02-01"), ("resource", resource)])
            .send()
            .await
            .map_err(|e| auth_error("managed-identity", format!("IMDS unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(auth_error(
                "managed-identity",
                format!("IMDS returned HTTP {}", response.status()),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error("managed-identity", format!("malformed IMDS response: {e}")))?;

        Ok(AccessToken::new(token.access_token))
    }
}

/// Cached Azure CLI login (`az account get-access-token`).
#[derive(Debug, Default)]
pub struct AzureCliCredential;

/// Token payload emitted by `az account get-access-token --output json`.
#[derive(Debug, Deserialize)]
struct CliTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

impl AzureCliCredential {
    /// Create a new Azure CLI credential.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn parse_output(stdout: &[u8]) -> Result<AccessToken, SecretError> {
        let token: CliTokenResponse = serde_json::from_slice(stdout)
            .map_err(|e| auth_error("cli", format!("unexpected az output: {e}")))?;
        Ok(AccessToken::new(token.access_token))
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, SecretError> {
        let resource = scope_to_resource(scope);

        let output = Command::new("az")
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| auth_error("cli", format!("failed to execute az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(auth_error("cli", format!("az failed: {}", stderr.trim())));
        }

        Self::parse_output(&output.stdout)
    }
}

/// Ordered fallback chain over the locally-available credential sources.
///
/// Mirrors the default Azure credential order for the sources kvenv
/// supports: environment service principal, then managed identity, then the
/// Azure CLI. The first provider that produces a token wins; if none do,
/// the accumulated per-provider failures are reported as a single
/// authentication error.
pub struct DefaultCredentialChain {
    providers: Vec<Box<dyn TokenCredential>>,
}

impl Default for DefaultCredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialChain {
    /// Create the chain with the default provider order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: vec![
                Box::new(EnvironmentCredential::new()),
                Box::new(ManagedIdentityCredential::new()),
                Box::new(AzureCliCredential::new()),
            ],
        }
    }

    /// Create a chain from an explicit provider list (primarily for tests).
    #[must_use]
    pub fn from_providers(providers: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { providers }
    }

    /// Number of providers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for DefaultCredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultCredentialChain")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredentialChain {
    fn name(&self) -> &'static str {
        "default-chain"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, SecretError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(provider = provider.name(), "Credential acquired");
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!(provider = provider.name(), %err, "Credential unavailable");
                    failures.push(err.to_string());
                }
            }
        }

        Err(SecretError::Authentication {
            message: if failures.is_empty() {
                "credential chain is empty".to_string()
            } else {
                failures.join("; ")
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticCredential {
        name: &'static str,
        token: Option<&'static str>,
    }

    #[async_trait]
    impl TokenCredential for StaticCredential {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken, SecretError> {
            self.token
                .map(|t| AccessToken::new(t.to_string()))
                .ok_or_else(|| auth_error(self.name, "unavailable"))
        }
    }

    #[test]
    fn scope_to_resource_strips_default_suffix() {
        assert_eq!(
            scope_to_resource("https://vault.azure.net/.default"),
            "https://vault.azure.net"
        );
        assert_eq!(
            scope_to_resource("https://vault.azure.net"),
            "https://vault.azure.net"
        );
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJ0eXAi.secret".to_string());
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.expose(), "eyJ0eXAi.secret");
    }

    #[test]
    fn cli_output_parses_access_token() {
        let stdout = br#"{"accessToken": "tok123", "expiresOn": "2026-08-29 12:00:00.000000", "tokenType": "Bearer"}"#;
        let token = AzureCliCredential::parse_output(stdout).unwrap();
        assert_eq!(token.expose(), "tok123");
    }

    #[test]
    fn cli_garbage_output_is_authentication_error() {
        let err = AzureCliCredential::parse_output(b"not json").unwrap_err();
        assert!(matches!(err, SecretError::Authentication { .. }));
    }

    #[tokio::test]
    async fn chain_returns_first_success() {
        let chain = DefaultCredentialChain::from_providers(vec![
            Box::new(StaticCredential {
                name: "first",
                token: None,
            }),
            Box::new(StaticCredential {
                name: "second",
                token: Some("winner"),
            }),
            Box::new(StaticCredential {
                name: "third",
                token: Some("never-reached"),
            }),
        ]);

        let token = chain
            .get_token("https://vault.azure.net/.default")
            .await
            .unwrap();
        assert_eq!(token.expose(), "winner");
    }

    #[tokio::test]
    async fn chain_accumulates_all_failures() {
        let chain = DefaultCredentialChain::from_providers(vec![
            Box::new(StaticCredential {
                name: "one",
                token: None,
            }),
            Box::new(StaticCredential {
                name: "two",
                token: None,
            }),
        ]);

        let err = chain
            .get_token("https://vault.azure.net/.default")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("one"));
        assert!(msg.contains("two"));
    }

    #[tokio::test]
    async fn empty_chain_is_authentication_error() {
        let chain = DefaultCredentialChain::from_providers(vec![]);
        let err = chain
            .get_token("https://vault.azure.net/.default")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Authentication { .. }));
    }

    #[tokio::test]
    async fn environment_credential_requires_all_three_vars() {
        temp_env::async_with_vars(
            [
                ("AZURE_TENANT_ID", Some("tenant")),
                ("AZURE_CLIENT_ID", None::<&str>),
                ("AZURE_CLIENT_SECRET", None::<&str>),
            ],
            async {
                let credential = EnvironmentCredential::new();
                let err = credential
                    .get_token("https://vault.azure.net/.default")
                    .await
                    .unwrap_err();
                assert!(err.to_string().contains("AZURE_CLIENT_ID"));
            },
        )
        .await;
    }

    #[test]
    fn default_chain_has_fixed_order() {
        let chain = DefaultCredentialChain::new();
        let names = format!("{chain:?}");
        let env_pos = names.find("environment").unwrap();
        let msi_pos = names.find("managed-identity").unwrap();
        let cli_pos = names.find("cli").unwrap();
        assert!(env_pos < msi_pos && msi_pos < cli_pos);
    }
}
