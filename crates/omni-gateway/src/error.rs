//! Gateway error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or running the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::GatewayConfig`].
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// The configuration is well-formed but inconsistent.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// A platform command could not be encoded.
    #[error("command rejected: {0}")]
    Protocol(#[from] omni_protocol::ProtocolError),
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
