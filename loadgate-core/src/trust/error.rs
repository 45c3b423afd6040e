//! Trust gate error types
//!
//! These cover caller-side problems only. A module that fails a trust check
//! is reported through a verdict, never through an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the trust gate
#[derive(Error, Debug)]
pub enum TrustError {
    /// The module's file path could not be resolved
    #[error("Failed to resolve module path: {detail}")]
    ModulePathUnresolved { detail: String },

    /// The expected module name cannot be appended to a sanctioned root
    #[error("Invalid module name {name:?}\n\nThe expected name must be a bare file name such as \"RzChromaSDK64.dll\".")]
    InvalidModuleName { name: String },

    /// Failed to read a root configuration file
    #[error("Failed to read gate configuration from {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a root configuration file
    #[error("Failed to parse gate configuration {path} (invalid YAML)")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl TrustError {
    pub fn unresolved(detail: impl Into<String>) -> Self {
        TrustError::ModulePathUnresolved {
            detail: detail.into(),
        }
    }
}
