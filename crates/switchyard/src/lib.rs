//! # Switchyard
//!
//! Interaction routing and session lifecycle for chat bots.
//!
//! ## Overview
//!
//! Switchyard takes inbound interactions (slash and context commands, button and
//! select-menu clicks, modal submissions, autocomplete requests), finds the handler
//! declared for them and runs it inside a *runtime*: a short-lived conversation
//! scope that keeps controller instances and properties alive across the follow-up
//! interactions it issued custom ids for.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌────────────┐   ┌─────────────┐   ┌────────────┐
//! │ Gateway  │──▶│ Dispatcher │──▶│ Middleware │──▶│ Adapt and   │──▶│ Controller │──▶ ReplySink
//! │ (host)   │   │  (route)   │   │   chain    │   │  validate   │   │  method    │
//! └──────────┘   └────────────┘   └────────────┘   └─────────────┘   └────────────┘
//!                      │
//!                      ▼
//!               RuntimeManager ◀── sweeper (SwitchyardHost)
//! ```
//!
//! - **core**: definitions, registry, custom ids, interactions and replies
//! - **framework**: dispatcher, runtimes, middleware, type adapters and validators
//! - **runtime**: configuration, logging and the [`SwitchyardHost`](runtime::SwitchyardHost)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! #[async_trait]
//! impl Controller for Greeter {
//!     async fn invoke(&mut self, method: &str, ctx: &mut InvocationContext) -> HandlerResult {
//!         match method {
//!             "ping" => Ok(Some(ReplyIntent::text("pong"))),
//!             other => Err(format!("unknown method {other}").into()),
//!         }
//!     }
//! }
//!
//! let registry = DefinitionRegistry::from_descriptors([
//!     InteractionDescriptor::slash_command("Greeter", "ping", "ping"),
//! ])?;
//! let dispatcher = Dispatcher::builder(registry)
//!     .instances(ControllerRegistry::new().register::<Greeter>("Greeter"))
//!     .reply_sink(sink);
//!
//! let host = SwitchyardHost::builder().build(dispatcher)?;
//! host.run().await?;
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use switchyard_core as core;
pub use switchyard_framework as framework;
pub use switchyard_runtime as runtime;

/// Commonly used types for building handlers and hosts.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    // Host
    pub use switchyard_runtime::{HostBuilder, SwitchyardHost};

    // Definitions
    pub use switchyard_core::{
        AutoCompleteRule, ComponentKind, Constraint, DefaultPolicy, DefinitionRegistry,
        InteractionDescriptor, OptionDefinition, OptionType, TextInputDefinition,
    };

    // Events and replies
    pub use switchyard_core::{Choice, CustomId, Interaction, ReplyIntent};

    // Handlers
    pub use switchyard_framework::{
        Controller, ControllerRegistry, FromArgument, HandlerResult, InvocationContext,
    };
    pub use switchyard_framework::async_trait;

    // Dispatching
    pub use switchyard_framework::{
        DispatchOutcome, Dispatcher, Middleware, Priority, ReplySink, middleware_fn,
    };
}
