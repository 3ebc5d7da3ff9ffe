//! Error types for the supervisor, the payload codec and configuration loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced synchronously by [`ProcessSupervisor`](crate::supervisor::ProcessSupervisor).
///
/// Spawn failures are deliberately absent: a worker that could not be started is
/// recorded without an identity instead of failing the launch.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Configuration error: project root {} is not an existing directory", path.display())]
    Configuration { path: PathBuf },
    #[error("Worker {target} not found (resolved to {})", path.display())]
    NotFound { target: String, path: PathBuf },
    #[error("Payload error: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("argument is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot find home directory")]
    HomeDirMissing,
    #[error("Config file error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid JSON format in config file {}: {source}", path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
