//! Handler seam.
//!
//! Handler methods are grouped in controllers. A controller is a stateful object
//! (one instance per runtime and handler class) that receives the method name from
//! the resolved definition and routes it to its own code:
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Counter {
//!     clicks: u32,
//! }
//!
//! #[async_trait]
//! impl Controller for Counter {
//!     async fn invoke(&mut self, method: &str, ctx: &mut InvocationContext) -> HandlerResult {
//!         match method {
//!             "start" => {
//!                 let button = ctx.bound_custom_id("Counter", "click", "")?;
//!                 Ok(Some(ReplyIntent::text("0").with_component(&button)))
//!             }
//!             "click" => {
//!                 self.clicks += 1;
//!                 Ok(Some(ReplyIntent::text(self.clicks.to_string())))
//!             }
//!             other => Err(format!("unknown method {other}").into()),
//!         }
//!     }
//! }
//! ```
//!
//! Instances are created lazily through an [`InstanceProvider`]; the default
//! [`ControllerRegistry`] maps handler class names to factories.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::ReplyIntent;

use crate::context::InvocationContext;
pub use crate::error::HandlerError;

/// What a handler method returns: an optional reply, or an error that is logged and
/// replaced by a generic failure reply.
pub type HandlerResult = Result<Option<ReplyIntent>, HandlerError>;

/// A group of handler methods sharing per-runtime state.
#[async_trait]
pub trait Controller: Send + 'static {
    async fn invoke(&mut self, method: &str, ctx: &mut InvocationContext) -> HandlerResult;
}

/// Creates controller instances for handler classes.
pub trait InstanceProvider: Send + Sync {
    fn instantiate(&self, class: &str) -> Option<Box<dyn Controller>>;
}

type Factory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// An [`InstanceProvider`] backed by explicitly registered factories.
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    factories: HashMap<String, Factory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `Default`-constructible controller under `class`.
    pub fn register<C>(mut self, class: impl Into<String>) -> Self
    where
        C: Controller + Default,
    {
        self.factories
            .insert(class.into(), Arc::new(|| Box::new(C::default()) as Box<dyn Controller>));
        self
    }

    /// Registers a factory closure under `class`.
    pub fn register_with<F, C>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller,
    {
        self.factories
            .insert(class.into(), Arc::new(move || Box::new(factory()) as Box<dyn Controller>));
        self
    }

    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }
}

impl InstanceProvider for ControllerRegistry {
    fn instantiate(&self, class: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(class).map(|factory| factory())
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("classes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl Controller for Noop {
        async fn invoke(&mut self, _method: &str, _ctx: &mut InvocationContext) -> HandlerResult {
            Ok(None)
        }
    }

    #[test]
    fn test_registry_instantiates_known_classes() {
        let registry = ControllerRegistry::new()
            .register::<Noop>("Noop")
            .register_with("Other", || Noop);
        assert!(registry.contains("Noop"));
        assert!(registry.instantiate("Noop").is_some());
        assert!(registry.instantiate("Other").is_some());
        assert!(registry.instantiate("Missing").is_none());
    }
}
