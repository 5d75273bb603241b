//! kvenv CLI Application
//!
//! Fetches the secrets named in `config.toml` from an Azure Key Vault,
//! mirrors them into the process environment, and appends masked
//! `KEY=value` lines to the `GITHUB_ENV` file for subsequent pipeline
//! steps. `GITHUB_ENV` must be set; the tool is built for CI runs.
//!
//! There are no flags: behaviour is driven entirely by `config.toml`,
//! `logging-conf.yaml` and the environment variables documented in the
//! readme. Exit code 0 on success, 1 on any failure.

mod logging;

use kvenv_azure::{DefaultCredentialChain, KeyVaultClient};
use kvenv_core::VaultConfig;
use kvenv_github::GithubEnvFile;
use kvenv_secrets::resolve_secrets;
use miette::IntoDiagnostic;
use tracing::Level;

/// Entry point. A current-thread runtime is deliberate: the pipeline is
/// fully sequential (one auth, one fetch per secret, one export pass) and
/// the process environment is mutated along the way.
#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    // Optional .env file for local runs; ignored when absent.
    dotenvy::dotenv().ok();

    logging::init_logging(
        logging::DEFAULT_LOGGING_CONFIG_PATH,
        logging::LOGGING_CONFIG_ENV,
        Level::INFO,
    )
    .into_diagnostic()?;

    let result = run().await;
    if let Err(report) = &result {
        tracing::error!(error = %report, "kvenv run failed");
    }
    result
}

/// One pass of the pipeline: load config, authenticate, fetch, export.
/// Any failure at any stage aborts the run; nothing is caught or retried.
async fn run() -> miette::Result<()> {
    tracing::info!("Starting to fetch secrets from the key vault");

    let config = VaultConfig::load(VaultConfig::default_path()).into_diagnostic()?;

    let chain = DefaultCredentialChain::new();
    let client = KeyVaultClient::connect(config.vault_name.clone(), &chain)
        .await
        .into_diagnostic()?;

    let bundle = resolve_secrets(&config, &client).await.into_diagnostic()?;
    bundle.apply_to_process_env();

    let env_file = GithubEnvFile::from_env().into_diagnostic()?;
    env_file.export(&bundle).into_diagnostic()?;

    tracing::info!("Finished fetching secrets from the key vault");
    Ok(())
}
