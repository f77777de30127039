//! Middleware pipeline.
//!
//! Middleware runs before argument adaptation, in [`Priority`] order. Each unit
//! receives the [`InvocationContext`] by `&mut` and may:
//!
//! - observe the interaction and the resolved definition;
//! - attach data to the context's state map for later stages;
//! - cancel the invocation, optionally with a reply.
//!
//! Once a unit cancels, no further middleware runs and the handler is not invoked.
//!
//! # Example
//!
//! ```rust,ignore
//! let chain = MiddlewareChain::new()
//!     .with(Priority::High, middleware_fn("audit", |ctx| {
//!         tracing::info!(command = %ctx.definition().display_name(), "Invocation");
//!     }))
//!     .with(Priority::Normal, MaintenanceGate::default());
//! ```

mod cooldown;
mod permissions;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::context::InvocationContext;

pub use cooldown::CooldownMiddleware;
pub use permissions::{DefaultPermissionsProvider, PermissionsMiddleware, PermissionsProvider};

/// Execution order of middleware. Lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Reserved for permission checks; runs before everything else.
    Permissions,
    High,
    Normal,
    Low,
}

/// One stage of the pipeline.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: &mut InvocationContext);

    /// Handler classes this middleware is limited to. `None` runs for every class.
    fn run_for(&self) -> Option<&[String]> {
        None
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Wraps a synchronous closure as middleware.
pub fn middleware_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(&mut InvocationContext) + Send + Sync + 'static,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

/// Middleware built by [`middleware_fn`].
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut InvocationContext) + Send + Sync + 'static,
{
    async fn handle(&self, ctx: &mut InvocationContext) {
        (self.f)(ctx);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct Entry {
    priority: Priority,
    middleware: Arc<dyn Middleware>,
}

/// Priority-ordered middleware list. Equal priorities keep registration order.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: Vec<Entry>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<M: Middleware>(mut self, priority: Priority, middleware: M) -> Self {
        self.register(priority, middleware);
        self
    }

    pub fn register<M: Middleware>(&mut self, priority: Priority, middleware: M) -> &mut Self {
        self.register_shared(priority, Arc::new(middleware))
    }

    pub fn register_shared(&mut self, priority: Priority, middleware: Arc<dyn Middleware>) -> &mut Self {
        let index = self
            .entries
            .partition_point(|entry| entry.priority <= priority);
        self.entries.insert(index, Entry {
            priority,
            middleware,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the chain. Returns `false` if a unit cancelled the invocation.
    pub async fn run(&self, ctx: &mut InvocationContext) -> bool {
        for entry in &self.entries {
            if let Some(classes) = entry.middleware.run_for() {
                let class = &ctx.definition().handler().class;
                if !classes.iter().any(|candidate| candidate == class) {
                    trace!(middleware = entry.middleware.name(), %class, "Middleware not applicable");
                    continue;
                }
            }

            entry.middleware.handle(ctx).await;
            if ctx.is_cancelled() {
                debug!(
                    middleware = entry.middleware.name(),
                    priority = ?entry.priority,
                    definition_id = %ctx.definition().id(),
                    "Invocation cancelled by middleware"
                );
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.priority, entry.middleware.name())),
            )
            .finish()
    }
}
