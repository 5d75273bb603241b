//! Secure secret types
//!
//! [`SecureSecret`] wraps `secrecy::SecretString` so resolved values are
//! zeroed on drop and never leak through `Debug`/`Display`. [`SecretBundle`]
//! is the ordered collection the pipeline builds and the exporter consumes.

use secrecy::{ExposeSecret, SecretString};

/// A vault-returned value in zeroing storage.
///
/// The value is readable only through [`expose`](Self::expose); every
/// formatting path (`Debug`, `Display`) prints `[REDACTED]` so a bundle or
/// error context can be logged without leaking. The two places allowed to
/// expose are the env-var mirror and the masked `GITHUB_ENV` write.
#[derive(Clone)]
pub struct SecureSecret(SecretString);

impl SecureSecret {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(SecretString::from(value))
    }

    /// Borrow the plaintext. Do not let the borrow outlive the immediate
    /// write (env var, masked file line).
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the vault returned an empty string for this secret.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Ordered mapping of logical secret names to resolved values.
///
/// Built incrementally by [`resolve_secrets`](crate::resolve_secrets) and
/// handed by reference to the exporter. Entries keep pipeline insertion
/// order (which is config-file order). A `None` value records a secret the
/// vault answered for but that carried no value.
#[derive(Default)]
pub struct SecretBundle {
    entries: Vec<(String, Option<SecureSecret>)>,
}

impl SecretBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append an entry. Logical names are expected to be unique (the config
    /// loader guarantees this; TOML tables cannot repeat keys).
    pub fn insert(&mut self, logical_name: String, value: Option<SecureSecret>) {
        self.entries.push((logical_name, value));
    }

    /// Whether the bundle holds an entry for `logical_name`, null or not.
    #[must_use]
    pub fn contains(&self, logical_name: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == logical_name)
    }

    /// The resolved value for `logical_name`, `None` when the entry is
    /// absent or null. Use [`contains`](Self::contains) to tell those apart.
    #[must_use]
    pub fn value(&self, logical_name: &str) -> Option<&SecureSecret> {
        self.entries
            .iter()
            .find(|(name, _)| name == logical_name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SecureSecret>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mirror every entry into the current process's environment, one
    /// variable per logical name (case preserved, no sanitization). Null
    /// values are set as the empty string.
    ///
    /// This is the opt-in side-effect step: the pipeline itself never
    /// touches the environment.
    #[allow(unsafe_code)]
    pub fn apply_to_process_env(&self) {
        for (name, value) in &self.entries {
            let value = value.as_ref().map_or("", |secret| secret.expose());
            // SAFETY: kvenv is single-threaded (current-thread runtime); no
            // other thread reads or writes the environment concurrently.
            unsafe { std::env::set_var(name, value) };
        }
        tracing::debug!(count = self.entries.len(), "Applied secrets to process environment");
    }
}

impl std::fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBundle")
            .field("count", &self.entries.len())
            .field(
                "names",
                &self.entries.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
