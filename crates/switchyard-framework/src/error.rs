//! Error types for the Switchyard framework.

use switchyard_core::{OptionType, RawValue};
use thiserror::Error;

/// Boxed error returned by handler methods.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while assembling or running the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The builder was finished without an instance provider.
    #[error("dispatcher needs an instance provider")]
    MissingInstanceProvider,

    /// The instance provider does not know a handler class.
    #[error("no controller registered for handler class '{class}'")]
    UnknownController {
        /// The handler class that could not be instantiated.
        class: String,
    },
}

/// Why a raw value could not be turned into the declared option type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdaptError {
    /// A required option was not sent.
    #[error("required option is missing")]
    Missing,

    /// No adapter, direct or composed, leads from the raw kind to the target type.
    #[error("no adapter converts {raw:?} values into {target}")]
    NoPath {
        /// The raw value that was sent.
        raw: RawValue,
        /// The declared option type.
        target: OptionType,
    },

    /// Every applicable adapter rejected the value.
    #[error("value {raw:?} could not be parsed as {target}")]
    Rejected {
        /// The raw value that was sent.
        raw: RawValue,
        /// The declared option type.
        target: OptionType,
    },
}

/// Errors raised when a handler reads its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// No value for the argument; the option was optional and not sent.
    #[error("argument '{name}' is absent")]
    Absent {
        /// Option name.
        name: String,
    },

    /// The argument exists but holds a different type.
    #[error("argument '{name}' is not a {expected}")]
    TypeMismatch {
        /// Option name.
        name: String,
        /// Requested Rust type.
        expected: &'static str,
    },
}

/// Errors reported by a [`ReplySink`](crate::reply::ReplySink).
#[derive(Debug, Clone, Error)]
#[error("reply delivery failed: {0}")]
pub struct DeliveryError(pub String);

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for dispatcher assembly.
pub type DispatchResult<T> = Result<T, DispatchError>;
