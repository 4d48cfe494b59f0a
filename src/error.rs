//! Error types for the VolSync restic operator

use std::fmt;

/// Result type for the operator
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the operator
#[derive(Debug)]
pub enum Error {
    /// Kubernetes API error
    KubeError(String),
    /// Configuration error (unusable config file, no operator namespace)
    ConfigError(String),
    /// A credential field is not validly encoded
    DecodingError(String),
    /// Secret error
    SecretError(String),
    /// Change-detection store I/O error
    StorageError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::KubeError(msg) => write!(f, "Kubernetes API error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Error::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            Error::SecretError(msg) => write!(f, "Secret error: {}", msg),
            Error::StorageError(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
