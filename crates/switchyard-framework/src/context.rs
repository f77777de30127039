//! Per-dispatch invocation context.
//!
//! One [`InvocationContext`] is built for every dispatched interaction. Middleware and
//! handlers receive it by `&mut`, so the state map and cancellation flag need no
//! locking: the dispatcher runs the chain and the handler sequentially.
//!
//! - The **event**, **definition** and **runtime** are shared handles.
//! - The **state map** is keyed by type; middleware attaches data for later stages.
//! - **Cancellation** stops the pipeline after the current middleware, optionally with
//!   a reply.
//! - **Arguments** are filled in after middleware, once adaptation and validation
//!   succeed.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use switchyard_core::{
    CustomId, CustomIdError, Definition, DefinitionId, DefinitionRegistry, Interaction,
    ReplyIntent, RuntimeId,
};
use tracing::warn;

use crate::argument::Arguments;
use crate::runtime::{KeyValueStore, Runtime};

/// Outcome of a cancelled pipeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cancellation {
    pub(crate) reply: Option<ReplyIntent>,
}

/// Everything known about one interaction while it is being dispatched.
pub struct InvocationContext {
    interaction: Arc<Interaction>,
    definition: Arc<Definition>,
    runtime: Arc<Runtime>,
    registry: Arc<DefinitionRegistry>,
    custom_id: Option<CustomId>,
    arguments: Arguments,
    state: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    cancellation: Option<Cancellation>,
    close_requested: bool,
}

impl InvocationContext {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        definition: Arc<Definition>,
        runtime: Arc<Runtime>,
        registry: Arc<DefinitionRegistry>,
        custom_id: Option<CustomId>,
    ) -> Self {
        Self {
            interaction,
            definition,
            runtime,
            registry,
            custom_id,
            arguments: Arguments::new(),
            state: HashMap::new(),
            cancellation: None,
            close_requested: false,
        }
    }

    // ─── Event and routing ────────────────────────────────────────────────────

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn runtime_id(&self) -> RuntimeId {
        self.runtime.id()
    }

    pub(crate) fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Properties shared by every handler of this runtime.
    pub fn properties(&self) -> &KeyValueStore {
        self.runtime.properties()
    }

    /// The decoded custom id of a component or modal interaction.
    pub fn custom_id(&self) -> Option<&CustomId> {
        self.custom_id.as_ref()
    }

    /// The `extra` payload of the decoded custom id, empty for commands.
    pub fn extra(&self) -> &str {
        self.custom_id.as_ref().map_or("", CustomId::extra)
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub(crate) fn set_arguments(&mut self, arguments: Arguments) {
        self.arguments = arguments;
    }

    // ─── Custom ids for replies ───────────────────────────────────────────────

    /// Builds a custom id that routes back into this runtime.
    pub fn bound_custom_id(
        &self,
        class: &str,
        method: &str,
        extra: &str,
    ) -> Result<CustomId, CustomIdError> {
        CustomId::bound(self.target(class, method, false), self.runtime.id(), extra)
    }

    /// Builds a custom id that starts a fresh runtime on every interaction.
    pub fn independent_custom_id(
        &self,
        class: &str,
        method: &str,
        extra: &str,
    ) -> Result<CustomId, CustomIdError> {
        CustomId::independent(self.target(class, method, true), extra)
    }

    fn target(&self, class: &str, method: &str, independent: bool) -> DefinitionId {
        let id = DefinitionId::of(class, method);
        match self.registry.find_by_id(id.as_str()) {
            None => warn!(class, method, "Custom id targets a handler that is not registered"),
            Some(definition)
                if matches!(definition, Definition::Component(_))
                    && definition.is_independent() != independent =>
            {
                warn!(
                    class,
                    method,
                    independent,
                    "Custom id binding does not match the component declaration and will be dropped"
                );
            }
            Some(_) => {}
        }
        id
    }

    // ─── Per-dispatch state ───────────────────────────────────────────────────

    /// Stores a value for later stages of this dispatch, replacing any previous value
    /// of the same type.
    pub fn set_state<T: Any + Send + Sync>(&mut self, value: T) {
        self.state.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn state<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.state
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn take_state<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.state
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn has_state<T: Any + Send + Sync>(&self) -> bool {
        self.state.contains_key(&TypeId::of::<T>())
    }

    // ─── Control flow ─────────────────────────────────────────────────────────

    /// Stops the pipeline; nothing after the current middleware runs.
    pub fn cancel(&mut self) {
        self.cancellation = Some(Cancellation { reply: None });
    }

    /// Stops the pipeline and answers with `reply`.
    pub fn cancel_with(&mut self, reply: ReplyIntent) {
        self.cancellation = Some(Cancellation { reply: Some(reply) });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_some()
    }

    pub(crate) fn take_cancellation(&mut self) -> Option<Cancellation> {
        self.cancellation.take()
    }

    /// Closes the runtime once the current reply has been delivered.
    pub fn close_runtime(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("interaction", &self.interaction.id)
            .field("definition", self.definition.id())
            .field("runtime", &self.runtime.id())
            .field("cancelled", &self.is_cancelled())
            .field("close_requested", &self.close_requested)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::manager::RuntimeManager;
    use switchyard_core::{InteractionDescriptor, User};

    pub(crate) fn context_for(
        descriptor: InteractionDescriptor,
        interaction: Interaction,
    ) -> InvocationContext {
        let registry = Arc::new(DefinitionRegistry::from_descriptors([descriptor.clone()]).unwrap());
        let definition = Arc::new(descriptor.into_definition().unwrap());
        let runtime = RuntimeManager::default().create();
        InvocationContext::new(Arc::new(interaction), definition, runtime, registry, None)
    }

    fn ping() -> InvocationContext {
        context_for(
            InteractionDescriptor::slash_command("Greeter", "ping", "ping"),
            Interaction::slash(1, User::new(1, "alice"), "ping", vec![]),
        )
    }

    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    #[test]
    fn test_state_map() {
        let mut ctx = ping();
        assert!(!ctx.has_state::<Marker>());
        ctx.set_state(Marker(1));
        ctx.set_state(Marker(2));
        assert_eq!(ctx.state::<Marker>(), Some(&Marker(2)));
        assert_eq!(ctx.take_state::<Marker>(), Some(Marker(2)));
        assert!(ctx.state::<Marker>().is_none());
    }

    #[test]
    fn test_cancellation() {
        let mut ctx = ping();
        assert!(!ctx.is_cancelled());
        ctx.cancel_with(ReplyIntent::text("no"));
        assert!(ctx.is_cancelled());
        let cancellation = ctx.take_cancellation().unwrap();
        assert!(cancellation.reply.is_some());
    }

    #[test]
    fn test_bound_custom_id_targets_current_runtime() {
        let ctx = ping();
        let id = ctx.bound_custom_id("Greeter", "wave", "x").unwrap();
        assert_eq!(id.runtime_id(), Some(ctx.runtime_id()));
        assert_eq!(id.definition_id(), &DefinitionId::of("Greeter", "wave"));

        let independent = ctx.independent_custom_id("Greeter", "wave", "").unwrap();
        assert!(independent.is_independent());
        assert_eq!(ctx.extra(), "");
    }
}
