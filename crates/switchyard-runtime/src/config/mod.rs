//! Configuration module for the Switchyard host.
//!
//! Layered loading with figment (files, `SWITCHYARD_*` environment variables,
//! programmatic overrides) and validation of the result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ExpirationConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PolicyKind,
    SpanEventConfig, SwitchyardConfig,
};
pub use validation::validate_config;
