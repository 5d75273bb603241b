//! Azure Key Vault integration for kvenv
//!
//! Provides [`KeyVaultClient`], an implementation of
//! [`kvenv_secrets::SecretStore`] backed by the Key Vault REST API, and the
//! ordered credential-provider chain ([`DefaultCredentialChain`]) used to
//! authenticate against it.
//!
//! # Authentication
//!
//! The chain tries locally-available credential sources in a fixed
//! priority order, first success wins:
//!
//! 1. Environment service principal (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//!    `AZURE_CLIENT_SECRET`)
//! 2. Managed identity (IMDS, when running in Azure)
//! 3. Azure CLI (`az account get-access-token`)

mod client;
mod credentials;

pub use client::{KEYVAULT_SCOPE, KeyVaultClient};
pub use credentials::{
    AccessToken, AzureCliCredential, DefaultCredentialChain, EnvironmentCredential,
    ManagedIdentityCredential, TokenCredential,
};
