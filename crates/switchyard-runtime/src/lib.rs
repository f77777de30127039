//! Switchyard Runtime - host layer for the Switchyard interaction router.
//!
//! This crate provides:
//! - Layered configuration (`switchyard.toml`, profiles, `SWITCHYARD_*` variables)
//! - Logging setup driven by that configuration
//! - [`SwitchyardHost`], which owns the dispatcher and the sweeper expiring idle
//!   runtimes
//!
//! ```ignore
//! use switchyard_runtime::SwitchyardHost;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = SwitchyardHost::builder().build(dispatcher)?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

pub use config::{ConfigError, ConfigLoader, ConfigResult, SwitchyardConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{HostBuilder, SwitchyardHost};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for handler code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
