//! Error types for the lala platform client.
//!
//! Configuration and storage failures are defined here so every crate in the
//! workspace reports them the same way. Component-specific errors (token
//! exchange, API calls) live next to the code that raises them and convert
//! into [`LalaError`] where a single error type is convenient.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for lala operations.
#[derive(Error, Debug)]
pub enum LalaError {
    /// Required configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A key-value store could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors.
///
/// These indicate a deployment problem rather than a user-triggered
/// condition, so callers are expected to surface them loudly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required settings are empty or unset.
    #[error(transparent)]
    Missing(#[from] MissingSettings),

    /// A setting is present but cannot be parsed as a URL.
    #[error("Invalid URL in {setting}: {value:?} ({reason})")]
    InvalidUrl {
        /// Environment variable or field name.
        setting: &'static str,
        /// The offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid URL error.
    pub fn invalid_url(
        setting: &'static str,
        value: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::InvalidUrl {
            setting,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Every required setting that was missing, reported together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct MissingSettings {
    /// Names of the missing settings (environment variable names).
    pub names: Vec<&'static str>,
}

impl fmt::Display for MissingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Identity provider config missing: {}.\nSet them in the environment and restart.",
            self.names.join(", ")
        )
    }
}

impl MissingSettings {
    /// Create from a list of setting names.
    pub fn new(names: Vec<&'static str>) -> Self {
        Self { names }
    }
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error at {}: {source}", path.display())]
    Io {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("Corrupt storage file {}: {source}", path.display())]
    Corrupt {
        /// Backing file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
