//! Runtime error types.

use switchyard_framework::DispatchError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::config::ConfigError;

/// Errors that can occur while assembling or running a host.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The sweeper task panicked or was aborted.
    #[error("runtime sweeper failed: {0}")]
    Sweeper(#[from] JoinError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
