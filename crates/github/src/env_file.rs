//! `GITHUB_ENV` exporter
//!
//! Appends resolved secrets to the CI environment-propagation file:
//! first one `::add-mask::<value>` directive per mandatory credential key,
//! then one `TRANSFORMED_KEY=value` line per non-null bundle entry.
//!
//! Values are written verbatim. A value containing a newline corrupts the
//! file format; that is a documented limitation of the protocol, not
//! defended against here.

use kvenv_secrets::SecretBundle;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the CI environment-propagation file.
const GITHUB_ENV_VAR: &str = "GITHUB_ENV";

/// Logical names that must always be present in an exported bundle and
/// whose values are masked in CI logs. The export assumes these three are
/// always configured upstream.
pub const MASKED_KEYS: [&str; 3] = ["ARM_TENANT_ID", "ARM_CLIENT_ID", "ARM_CLIENT_SECRET"];

/// Errors produced by the CI export step.
#[derive(Debug, Error)]
pub enum ExportError {
    /// `GITHUB_ENV` is unset or empty; the file open is never attempted
    #[error("{GITHUB_ENV_VAR} is not set; not running under GitHub Actions?")]
    MissingEnvFile,

    /// A mandatory masked key is absent from the bundle
    #[error("Missing mandatory secret '{key}' in resolved bundle")]
    MissingKey {
        /// The absent logical name
        key: String,
    },

    /// The environment file could not be opened or written
    #[error("Failed to write {path}: {source}")]
    Io {
        /// Path of the environment file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Handle on the CI environment-propagation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubEnvFile {
    path: PathBuf,
}

impl GithubEnvFile {
    /// Locate the environment file from `GITHUB_ENV`.
    ///
    /// # Errors
    ///
    /// [`ExportError::MissingEnvFile`] when the variable is unset or empty.
    pub fn from_env() -> Result<Self, ExportError> {
        match std::env::var(GITHUB_ENV_VAR) {
            Ok(path) if !path.is_empty() => Ok(Self::new(path)),
            _ => Err(ExportError::MissingEnvFile),
        }
    }

    /// Use an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file being appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transform a logical name into its exported form: `-` becomes `_`,
    /// then upper-case. Applying the transform twice is a no-op.
    #[must_use]
    pub fn transform_key(logical_name: &str) -> String {
        logical_name.replace('-', "_").to_uppercase()
    }

    /// Append masking directives and `KEY=value` lines for `bundle`.
    ///
    /// All three [`MASKED_KEYS`] must be present in the bundle before
    /// anything is written; null-valued entries satisfy the presence check
    /// but emit no mask and no line.
    ///
    /// # Errors
    ///
    /// - [`ExportError::MissingKey`] if a mandatory key is absent (the file
    ///   is left untouched)
    /// - [`ExportError::Io`] on open/write failure
    pub fn export(&self, bundle: &SecretBundle) -> Result<(), ExportError> {
        for key in MASKED_KEYS {
            if !bundle.contains(key) {
                return Err(ExportError::MissingKey {
                    key: key.to_string(),
                });
            }
        }

        let mut contents = String::new();
        for key in MASKED_KEYS {
            if let Some(value) = bundle.value(key) {
                contents.push_str("::add-mask::");
                contents.push_str(value.expose());
                contents.push('\n');
            }
        }

        let mut exported = 0usize;
        for (logical_name, value) in bundle.iter() {
            let Some(value) = value else {
                tracing::debug!(logical_name, "Skipping null-valued secret");
                continue;
            };
            contents.push_str(&Self::transform_key(logical_name));
            contents.push('=');
            contents.push_str(value.expose());
            contents.push('\n');
            exported += 1;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| ExportError::Io {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(contents.as_bytes())
            .map_err(|source| ExportError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(
            count = exported,
            path = %self.path.display(),
            "Exported secrets to CI environment file"
        );
        Ok(())
    }
}
