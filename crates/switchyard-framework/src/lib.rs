//! # Switchyard Framework
//!
//! Dispatching and session lifecycle for the Switchyard interaction router.
//!
//! This layer provides:
//! - The [`Dispatcher`], which routes interactions to controller methods
//! - Runtimes: per-conversation sessions with an instance scope and a property store,
//!   managed and expired by the [`RuntimeManager`]
//! - A priority-ordered, cancellable [`MiddlewareChain`] with permission and cooldown
//!   checks built in
//! - Type adaptation of raw option values ([`TypeAdapterRegistry`]) and constraint
//!   validation ([`ValidatorRegistry`])
//! - Seams for the host: [`InstanceProvider`], [`EntityResolver`], [`ReplySink`] and
//!   [`ErrorReplies`]
//!
//! Definitions, custom ids and the event model live in `switchyard-core`.

pub mod adapter;
pub mod argument;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod manager;
pub mod middleware;
pub mod reply;
pub mod runtime;
pub mod validation;

pub use async_trait::async_trait;

pub use adapter::{
    AdaptContext, AdaptationFailure, ArgumentMapper, EntityCache, EntityResolver, NoEntities,
    TypeAdapter, TypeAdapterRegistry,
};
pub use argument::{Argument, Arguments, CustomArgument, FromArgument, Mentionable};
pub use context::InvocationContext;
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, DropReason};
pub use error::{AdaptError, ArgumentError, DeliveryError, DispatchError, DispatchResult, HandlerError};
pub use handler::{Controller, ControllerRegistry, HandlerResult, InstanceProvider};
pub use manager::{
    DEFAULT_INACTIVITY, ExpirationPolicy, MIN_SWEEP_INTERVAL, RuntimeManager, RuntimeStats,
};
pub use middleware::{
    CooldownMiddleware, DefaultPermissionsProvider, FnMiddleware, Middleware, MiddlewareChain,
    PermissionsMiddleware, PermissionsProvider, Priority, middleware_fn,
};
pub use reply::{
    ChannelReplySink, DefaultErrorReplies, Delivery, ErrorReplies, NoopReplySink, ReplySink,
};
pub use runtime::{InstanceScope, KeyValueStore, Runtime, RuntimeState};
pub use validation::{ValidationContext, ValidationFailure, Validator, ValidatorRegistry};
