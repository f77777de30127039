//! Error types for definitions, descriptors and custom ids.

use thiserror::Error;

/// Errors raised while building the definition registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Two definitions share the same definition id.
    #[error("duplicate definition '{id}' ({display_name})")]
    DuplicateDefinition {
        /// The colliding definition id.
        id: String,
        /// Display name of the definition that was rejected.
        display_name: String,
    },

    /// Two commands of the same kind share a full name.
    #[error("duplicate command name '{name}'")]
    DuplicateName {
        /// The colliding command name.
        name: String,
    },

    /// A descriptor could not be turned into a definition.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Errors raised while validating an [`InteractionDescriptor`](crate::InteractionDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Handler class or method is empty.
    #[error("descriptor is missing its handler class or method")]
    MissingHandler,

    /// Handler class or method contains the `#` that separates them in the id hash.
    #[error("handler '{class}#{method}' contains a reserved '#'")]
    ReservedSeparator {
        /// Handler class.
        class: String,
        /// Handler method.
        method: String,
    },

    /// A command name does not follow the platform naming rules.
    #[error("invalid command name '{name}': {reason}")]
    InvalidCommandName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// Two options of one command share a name.
    #[error("command '{command}' declares option '{option}' twice")]
    DuplicateOption {
        /// Command name.
        command: String,
        /// Option name.
        option: String,
    },

    /// A required option follows an optional one.
    #[error("command '{command}': required option '{option}' follows an optional option")]
    RequiredAfterOptional {
        /// Command name.
        command: String,
        /// Option name.
        option: String,
    },

    /// A `pattern` constraint carries a regex that does not compile.
    #[error("option '{option}' has an invalid pattern: {message}")]
    InvalidPattern {
        /// Option name.
        option: String,
        /// Compiler message from the regex engine.
        message: String,
    },

    /// A modal declares no inputs or more inputs than the platform allows.
    #[error("modal '{title}' must declare between 1 and {max} inputs, got {count}")]
    InputCount {
        /// Modal title.
        title: String,
        /// Number of declared inputs.
        count: usize,
        /// Platform maximum.
        max: usize,
    },

    /// An autocomplete descriptor has no rules.
    #[error("autocomplete handler {class}#{method} declares no rules")]
    EmptyRules {
        /// Handler class.
        class: String,
        /// Handler method.
        method: String,
    },
}

/// Errors raised while encoding or decoding a [`CustomId`](crate::CustomId).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomIdError {
    /// The input is not a well-formed custom id.
    #[error("invalid custom id '{input}': {reason}")]
    InvalidCustomId {
        /// The rejected input, truncated for logging.
        input: String,
        /// Why decoding failed.
        reason: &'static str,
    },

    /// The encoded id would exceed the platform limit.
    #[error("custom id would be {len} characters long, the limit is {max}")]
    CustomIdOverflow {
        /// Length of the encoding.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// The `extra` payload contains the segment separator.
    #[error("custom id extra must not contain ':'")]
    SeparatorInExtra,
}

impl CustomIdError {
    pub(crate) fn invalid(input: &str, reason: &'static str) -> Self {
        Self::InvalidCustomId {
            input: input.chars().take(120).collect(),
            reason,
        }
    }
}

/// Result type for registry operations.
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Result type for custom id operations.
pub type CustomIdResult<T> = Result<T, CustomIdError>;
