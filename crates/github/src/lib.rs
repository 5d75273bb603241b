//! GitHub Actions integration for kvenv
//!
//! Implements the single environment-file append protocol: masking
//! directives plus `KEY=value` lines written to the file named by
//! `GITHUB_ENV`, making resolved secrets available to subsequent pipeline
//! steps.

mod env_file;

pub use env_file::{ExportError, GithubEnvFile, MASKED_KEYS};
