//! Interaction dispatcher.
//!
//! The [`Dispatcher`] turns one inbound [`Interaction`] into at most one handler
//! invocation:
//!
//! 1. **Route.** Commands are looked up by full name and always start a fresh
//!    runtime. Autocomplete requests are routed to the handler serving the command
//!    and focused option, in a runtime that is closed right after. Components and
//!    modals decode their custom id; bound ids resolve the runtime they were issued
//!    from, independent ids start a fresh one. A component id must be bound or
//!    independent exactly as the component was declared.
//! 2. **Lock.** The runtime's instance scope is locked for the rest of the dispatch,
//!    so interactions of one runtime never run concurrently.
//! 3. **Middleware.** The [`MiddlewareChain`] may cancel, optionally with a reply.
//! 4. **Adapt and validate.** Options become [`Arguments`](crate::Arguments); failures
//!    are answered through [`ErrorReplies`].
//! 5. **Invoke.** The controller instance for the handler class is created on first
//!    use and called. Errors and panics, including panics in middleware, adapters
//!    and validators, are logged and answered generically.
//!
//! Routing misses never produce a reply; they are reported as
//! [`DispatchOutcome::Dropped`].

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use mockable::{Clock, DefaultClock};
use switchyard_core::{
    CommandKind, ContextTarget, CustomId, Definition, DefinitionRegistry, Interaction,
    InteractionKind, OptionType, RawKind, ReplyIntent, RuntimeBinding,
};
use tower::Service;
use tracing::field::{Empty, display};
use tracing::{Instrument, Span, debug, error, info_span, warn};

use crate::adapter::{AdaptContext, ArgumentMapper, EntityResolver, NoEntities, TypeAdapter, TypeAdapterRegistry};
use crate::context::InvocationContext;
use crate::error::{DispatchError, DispatchResult};
use crate::handler::InstanceProvider;
use crate::manager::{ExpirationPolicy, RuntimeManager};
use crate::middleware::{
    CooldownMiddleware, DefaultPermissionsProvider, Middleware, MiddlewareChain,
    PermissionsMiddleware, PermissionsProvider, Priority,
};
use crate::reply::{DefaultErrorReplies, ErrorReplies, NoopReplySink, ReplySink};
use crate::runtime::{InstanceScope, Runtime};
use crate::validation::{ValidationContext, Validator, ValidatorRegistry};

// =============================================================================
// Outcomes
// =============================================================================

/// How one dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and returned normally.
    Completed,
    /// Middleware cancelled the invocation.
    Cancelled,
    /// Adaptation or validation failed.
    Rejected,
    /// The handler returned an error or panicked.
    Failed,
    /// The interaction could not be routed and was ignored.
    Dropped(DropReason),
}

/// Why an interaction was not routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    UnknownCommand,
    InvalidCustomId,
    UnknownDefinition,
    /// The custom id points at a definition of another kind, e.g. a modal id on a
    /// button.
    KindMismatch,
    /// An independent id on a bound component, or the other way round.
    BindingMismatch,
    /// The bound runtime is closed or expired.
    StaleRuntime,
    NoAutoComplete,
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`Dispatcher`].
pub struct DispatcherBuilder {
    registry: DefinitionRegistry,
    policy: ExpirationPolicy,
    clock: Arc<dyn Clock + Send + Sync>,
    middleware: MiddlewareChain,
    adapters: TypeAdapterRegistry,
    validators: ValidatorRegistry,
    instances: Option<Arc<dyn InstanceProvider>>,
    entities: Arc<dyn EntityResolver>,
    error_replies: Arc<dyn ErrorReplies>,
    permissions: Arc<dyn PermissionsProvider>,
    reply_sink: Arc<dyn ReplySink>,
    builtin_middlewares: bool,
}

impl DispatcherBuilder {
    fn new(registry: DefinitionRegistry) -> Self {
        Self {
            registry,
            policy: ExpirationPolicy::default(),
            clock: Arc::new(DefaultClock),
            middleware: MiddlewareChain::new(),
            adapters: TypeAdapterRegistry::with_defaults(),
            validators: ValidatorRegistry::with_defaults(),
            instances: None,
            entities: Arc::new(NoEntities),
            error_replies: Arc::new(DefaultErrorReplies),
            permissions: Arc::new(DefaultPermissionsProvider),
            reply_sink: Arc::new(NoopReplySink),
            builtin_middlewares: true,
        }
    }

    pub fn expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Time source for runtime expiration and cooldowns.
    pub fn clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn middleware<M: Middleware>(mut self, priority: Priority, middleware: M) -> Self {
        self.middleware.register(priority, middleware);
        self
    }

    pub fn adapter<A>(mut self, raw: RawKind, target: OptionType, adapter: A) -> Self
    where
        A: TypeAdapter + 'static,
    {
        self.adapters.register(raw, target, adapter);
        self
    }

    pub fn mapper<M>(mut self, from: OptionType, to: OptionType, mapper: M) -> Self
    where
        M: ArgumentMapper + 'static,
    {
        self.adapters.register_mapper(from, to, mapper);
        self
    }

    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        self.validators.register(validator);
        self
    }

    pub fn instances<P: InstanceProvider + 'static>(mut self, provider: P) -> Self {
        self.instances = Some(Arc::new(provider));
        self
    }

    pub fn entities<R: EntityResolver + 'static>(mut self, resolver: R) -> Self {
        self.entities = Arc::new(resolver);
        self
    }

    pub fn error_replies<E: ErrorReplies + 'static>(mut self, replies: E) -> Self {
        self.error_replies = Arc::new(replies);
        self
    }

    pub fn permissions_provider<P: PermissionsProvider + 'static>(mut self, provider: P) -> Self {
        self.permissions = Arc::new(provider);
        self
    }

    pub fn reply_sink<S: ReplySink + 'static>(mut self, sink: S) -> Self {
        self.reply_sink = Arc::new(sink);
        self
    }

    /// Skips the permissions and cooldown middleware.
    pub fn without_builtin_middlewares(mut self) -> Self {
        self.builtin_middlewares = false;
        self
    }

    pub fn build(self) -> DispatchResult<Dispatcher> {
        let instances = self.instances.ok_or(DispatchError::MissingInstanceProvider)?;

        let mut middleware = self.middleware;
        if self.builtin_middlewares {
            middleware
                .register(
                    Priority::Permissions,
                    PermissionsMiddleware::new(self.permissions, Arc::clone(&self.error_replies)),
                )
                .register(
                    Priority::Normal,
                    CooldownMiddleware::new(Arc::clone(&self.clock), Arc::clone(&self.error_replies)),
                );
        }

        let inner = DispatcherInner {
            registry: Arc::new(self.registry),
            runtimes: Arc::new(RuntimeManager::with_clock(self.policy, self.clock)),
            middleware,
            adapters: self.adapters,
            validators: self.validators,
            instances,
            entities: self.entities,
            error_replies: self.error_replies,
            reply_sink: self.reply_sink,
        };
        debug!(
            definitions = inner.registry.len(),
            middleware = inner.middleware.len(),
            policy = ?self.policy,
            "Dispatcher built"
        );
        Ok(Dispatcher {
            inner: Arc::new(inner),
        })
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

struct DispatcherInner {
    registry: Arc<DefinitionRegistry>,
    runtimes: Arc<RuntimeManager>,
    middleware: MiddlewareChain,
    adapters: TypeAdapterRegistry,
    validators: ValidatorRegistry,
    instances: Arc<dyn InstanceProvider>,
    entities: Arc<dyn EntityResolver>,
    error_replies: Arc<dyn ErrorReplies>,
    reply_sink: Arc<dyn ReplySink>,
}

/// Where an interaction goes.
struct Route {
    definition: Arc<Definition>,
    runtime: Arc<Runtime>,
    custom_id: Option<CustomId>,
    close_after: bool,
}

/// Routes interactions to handlers. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub fn builder(registry: DefinitionRegistry) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.inner.registry
    }

    pub fn runtimes(&self) -> &Arc<RuntimeManager> {
        &self.inner.runtimes
    }

    /// Dispatches one interaction to completion.
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            interaction_id = interaction.id,
            kind = interaction.kind_name(),
            definition_id = Empty,
            runtime_id = Empty,
        );
        self.dispatch_routed(Arc::new(interaction))
            .instrument(span)
            .await
    }

    async fn dispatch_routed(&self, interaction: Arc<Interaction>) -> DispatchOutcome {
        let Route {
            definition,
            runtime,
            custom_id,
            close_after,
        } = match self.route(&interaction) {
            Ok(route) => route,
            Err(reason) => return DispatchOutcome::Dropped(reason),
        };

        let span = Span::current();
        span.record("definition_id", definition.id().as_str());
        span.record("runtime_id", display(runtime.id()));

        let mut scope = runtime.lock_scope().await;
        // `touch` fails if the sweeper expired the runtime after the state check.
        if runtime.is_closed() || !self.inner.runtimes.touch(runtime.id()) {
            debug!("Runtime closed while waiting for its scope");
            scope.clear();
            return DispatchOutcome::Dropped(DropReason::StaleRuntime);
        }

        let mut ctx = InvocationContext::new(
            Arc::clone(&interaction),
            Arc::clone(&definition),
            Arc::clone(&runtime),
            Arc::clone(&self.inner.registry),
            custom_id,
        );
        let outcome = match AssertUnwindSafe(self.invoke(&interaction, &mut ctx, &mut scope))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(
                    definition_id = %definition.id(),
                    runtime_id = %runtime.id(),
                    panic = panic_message(payload.as_ref()),
                    "Dispatch pipeline panicked"
                );
                let reply = self.inner.error_replies.execution_failed(&ctx);
                self.deliver(&interaction, reply).await;
                DispatchOutcome::Failed
            }
        };

        if close_after || ctx.close_requested() {
            self.inner.runtimes.close(runtime.id());
        }
        if runtime.is_closed() {
            scope.clear();
        }
        debug!(?outcome, "Dispatch finished");
        outcome
    }

    // ─── Routing ──────────────────────────────────────────────────────────────

    fn route(&self, interaction: &Interaction) -> Result<Route, DropReason> {
        let registry = &self.inner.registry;
        match &interaction.kind {
            InteractionKind::SlashCommand { name, .. } => {
                self.fresh(registry.shared_command(CommandKind::Slash, name), DropReason::UnknownCommand, name)
            }
            InteractionKind::ContextCommand { name, target } => {
                let kind = match target {
                    ContextTarget::User { .. } => CommandKind::User,
                    ContextTarget::Message { .. } => CommandKind::Message,
                };
                self.fresh(registry.shared_command(kind, name), DropReason::UnknownCommand, name)
            }
            InteractionKind::AutoComplete { command, focused, .. } => {
                let definition = registry
                    .shared_autocomplete(command, &focused.name)
                    .ok_or_else(|| {
                        debug!(command, option = %focused.name, "No autocomplete handler");
                        DropReason::NoAutoComplete
                    })?;
                Ok(Route {
                    definition,
                    runtime: self.inner.runtimes.create(),
                    custom_id: None,
                    close_after: true,
                })
            }
            InteractionKind::Component { custom_id, .. } => {
                self.resolve_custom_id(custom_id, |definition| matches!(definition, Definition::Component(_)))
            }
            InteractionKind::Modal { custom_id, .. } => {
                self.resolve_custom_id(custom_id, |definition| matches!(definition, Definition::Modal(_)))
            }
        }
    }

    fn fresh(&self, definition: Option<Arc<Definition>>, miss: DropReason, name: &str) -> Result<Route, DropReason> {
        let Some(definition) = definition else {
            debug!(name, "Unknown command");
            return Err(miss);
        };
        Ok(Route {
            definition,
            runtime: self.inner.runtimes.create(),
            custom_id: None,
            close_after: false,
        })
    }

    fn resolve_custom_id(
        &self,
        raw: &str,
        accepts: impl Fn(&Definition) -> bool,
    ) -> Result<Route, DropReason> {
        let custom_id = CustomId::decode(raw).map_err(|error| {
            warn!(%error, "Dropping interaction with invalid custom id");
            DropReason::InvalidCustomId
        })?;

        let definition = self
            .inner
            .registry
            .shared_by_id(custom_id.definition_id().as_str())
            .ok_or_else(|| {
                warn!(definition_id = %custom_id.definition_id(), "Custom id targets an unknown definition");
                DropReason::UnknownDefinition
            })?;
        if !accepts(&definition) {
            warn!(definition = %definition.display_name(), "Custom id targets a definition of another kind");
            return Err(DropReason::KindMismatch);
        }
        if matches!(*definition, Definition::Component(_))
            && definition.is_independent() != custom_id.is_independent()
        {
            warn!(
                definition = %definition.display_name(),
                independent = definition.is_independent(),
                "Custom id binding does not match the component declaration"
            );
            return Err(DropReason::BindingMismatch);
        }

        let runtime = match custom_id.binding() {
            RuntimeBinding::Bound(id) => self.inner.runtimes.get(id).ok_or_else(|| {
                debug!(runtime_id = %id, "Runtime is closed or expired, dropping interaction");
                DropReason::StaleRuntime
            })?,
            RuntimeBinding::Independent => self.inner.runtimes.create(),
        };

        Ok(Route {
            definition,
            runtime,
            custom_id: Some(custom_id),
            close_after: false,
        })
    }

    // ─── Invocation ───────────────────────────────────────────────────────────

    async fn invoke(
        &self,
        interaction: &Interaction,
        ctx: &mut InvocationContext,
        scope: &mut InstanceScope,
    ) -> DispatchOutcome {
        if !self.inner.middleware.run(ctx).await {
            if let Some(reply) = ctx.take_cancellation().and_then(|cancellation| cancellation.reply) {
                self.deliver(interaction, reply).await;
            }
            return DispatchOutcome::Cancelled;
        }

        let adapt = AdaptContext {
            interaction,
            entities: self.inner.entities.as_ref(),
        };
        let raw = interaction.raw_options();
        let arguments = match self.inner.adapters.adapt_options(ctx.definition().options(), &raw, &adapt) {
            Ok(arguments) => arguments,
            Err(failures) => {
                debug!(failed = failures.len(), "Arguments could not be adapted");
                let reply = self.inner.error_replies.adaptation_failed(ctx, &failures);
                self.deliver(interaction, reply).await;
                return DispatchOutcome::Rejected;
            }
        };

        let validation = ValidationContext {
            interaction,
            definition: ctx.definition(),
        };
        if let Err(failure) = self
            .inner
            .validators
            .validate(ctx.definition().options(), &arguments, &validation)
        {
            let reply = self.inner.error_replies.constraint_failed(ctx, &failure);
            self.deliver(interaction, reply).await;
            return DispatchOutcome::Rejected;
        }
        ctx.set_arguments(arguments);

        let handler = ctx.definition().handler().clone();
        let controller = match scope.get_or_create(&handler.class, self.inner.instances.as_ref()) {
            Ok(controller) => controller,
            Err(error) => {
                error!(%error, handler = %handler, "Cannot instantiate controller");
                let reply = self.inner.error_replies.execution_failed(ctx);
                self.deliver(interaction, reply).await;
                return DispatchOutcome::Failed;
            }
        };

        let result = AssertUnwindSafe(controller.invoke(&handler.method, ctx))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(reply)) => {
                if let Some(reply) = reply {
                    let reply = reply.apply_config(ctx.definition().reply_config());
                    self.deliver(interaction, reply).await;
                }
                DispatchOutcome::Completed
            }
            Ok(Err(failure)) => {
                error!(
                    definition_id = %ctx.definition().id(),
                    runtime_id = %ctx.runtime_id(),
                    handler = %handler,
                    error = %failure,
                    "Handler failed"
                );
                let reply = self.inner.error_replies.execution_failed(ctx);
                self.deliver(interaction, reply).await;
                DispatchOutcome::Failed
            }
            Err(payload) => {
                error!(
                    definition_id = %ctx.definition().id(),
                    runtime_id = %ctx.runtime_id(),
                    handler = %handler,
                    panic = panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                scope.evict(&handler.class);
                let reply = self.inner.error_replies.execution_failed(ctx);
                self.deliver(interaction, reply).await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn deliver(&self, interaction: &Interaction, reply: ReplyIntent) {
        if let Err(error) = self.inner.reply_sink.deliver(interaction, reply).await {
            warn!(%error, "Reply could not be delivered");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("definitions", &self.inner.registry.len())
            .field("middleware", &self.inner.middleware)
            .field("runtimes", &self.inner.runtimes)
            .finish_non_exhaustive()
    }
}

impl Service<Interaction> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<DispatchOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: Interaction) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(interaction).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Controller, ControllerRegistry, HandlerResult};
    use crate::reply::{ChannelReplySink, keys};
    use async_trait::async_trait;
    use switchyard_core::{InteractionDescriptor, User};
    use tower::ServiceExt;

    #[derive(Default)]
    struct Greeter {
        waves: u32,
    }

    #[async_trait]
    impl Controller for Greeter {
        async fn invoke(&mut self, method: &str, ctx: &mut InvocationContext) -> HandlerResult {
            match method {
                "ping" => {
                    let wave = ctx.bound_custom_id("Greeter", "wave", "")?;
                    Ok(Some(ReplyIntent::text("pong").with_component(&wave)))
                }
                "wave" => {
                    self.waves += 1;
                    Ok(Some(ReplyIntent::text(self.waves.to_string())))
                }
                "tap" => Ok(Some(ReplyIntent::text("tapped"))),
                "boom" => panic!("boom"),
                other => Err(format!("unknown method {other}").into()),
            }
        }
    }

    fn builder(sink: ChannelReplySink) -> DispatcherBuilder {
        let registry = DefinitionRegistry::from_descriptors([
            InteractionDescriptor::slash_command("Greeter", "ping", "ping"),
            InteractionDescriptor::slash_command("Greeter", "boom", "boom"),
            InteractionDescriptor::button("Greeter", "wave"),
            InteractionDescriptor::button("Greeter", "tap").independent(),
        ])
        .unwrap();
        Dispatcher::builder(registry)
            .instances(ControllerRegistry::new().register::<Greeter>("Greeter"))
            .reply_sink(sink)
    }

    fn dispatcher(sink: ChannelReplySink) -> Dispatcher {
        builder(sink).build().unwrap()
    }

    fn explode(_ctx: &mut InvocationContext) {
        panic!("middleware exploded");
    }

    fn alice() -> User {
        User::new(1, "alice")
    }

    #[test]
    fn test_build_requires_instances() {
        let result = Dispatcher::builder(DefinitionRegistry::builder().build()).build();
        assert_eq!(result.err(), Some(DispatchError::MissingInstanceProvider));
    }

    #[tokio::test]
    async fn test_button_reuses_runtime_instance() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = dispatcher(sink);

        let outcome = dispatcher.dispatch(Interaction::slash(1, alice(), "ping", vec![])).await;
        assert_eq!(outcome, DispatchOutcome::Completed);
        let reply = rx.recv().await.unwrap().reply;
        let button = reply.as_message().unwrap().components[0].clone();

        for expected in ["1", "2"] {
            let outcome = dispatcher.dispatch(Interaction::component(2, alice(), button.clone())).await;
            assert_eq!(outcome, DispatchOutcome::Completed);
            assert_eq!(rx.recv().await.unwrap().reply, ReplyIntent::text(expected));
        }
        assert_eq!(dispatcher.runtimes().len(), 1);
    }

    #[tokio::test]
    async fn test_routing_misses_are_dropped_silently() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = dispatcher(sink);
        let modal_id = format!("{}:INDEPENDENT:", switchyard_core::DefinitionId::of("Greeter", "wave"));

        let outcomes = [
            dispatcher.dispatch(Interaction::slash(1, alice(), "missing", vec![])).await,
            dispatcher.dispatch(Interaction::component(2, alice(), "garbage")).await,
            dispatcher.dispatch(Interaction::modal(3, alice(), modal_id, vec![])).await,
        ];
        assert_eq!(outcomes, [
            DispatchOutcome::Dropped(DropReason::UnknownCommand),
            DispatchOutcome::Dropped(DropReason::InvalidCustomId),
            DispatchOutcome::Dropped(DropReason::KindMismatch),
        ]);
        assert!(rx.try_recv().is_err());
        assert!(dispatcher.runtimes().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let mut dispatcher = dispatcher(sink);

        let outcome = dispatcher
            .ready()
            .await
            .unwrap()
            .call(Interaction::slash(1, alice(), "boom", vec![]))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Failed);
        let reply = rx.recv().await.unwrap().reply;
        assert_eq!(reply.message_key(), Some(keys::EXECUTION_FAILED));
    }

    #[tokio::test]
    async fn test_dispatches_of_one_runtime_are_serialized() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = dispatcher(sink);

        dispatcher.dispatch(Interaction::slash(1, alice(), "ping", vec![])).await;
        let button = rx.recv().await.unwrap().reply.as_message().unwrap().components[0].clone();
        let runtime_id = CustomId::decode(&button).unwrap().runtime_id().unwrap();
        let runtime = dispatcher.runtimes().get(runtime_id).unwrap();

        let guard = runtime.lock_scope().await;
        let mut click = tokio_test::task::spawn(dispatcher.dispatch(Interaction::component(2, alice(), button)));
        tokio_test::assert_pending!(click.poll());

        drop(guard);
        assert!(click.is_woken());
        tokio_test::assert_ready_eq!(click.poll(), DispatchOutcome::Completed);
        assert_eq!(rx.recv().await.unwrap().reply, ReplyIntent::text("1"));
    }

    #[tokio::test]
    async fn test_middleware_panic_is_contained() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = builder(sink)
            .middleware(Priority::High, crate::middleware::middleware_fn("explode", explode))
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(Interaction::slash(1, alice(), "ping", vec![])).await;
        assert_eq!(outcome, DispatchOutcome::Failed);
        let reply = rx.recv().await.unwrap().reply;
        assert_eq!(reply.message_key(), Some(keys::EXECUTION_FAILED));
    }

    #[tokio::test]
    async fn test_binding_must_match_component_declaration() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = dispatcher(sink);
        let wave = switchyard_core::DefinitionId::of("Greeter", "wave");
        let tap = switchyard_core::DefinitionId::of("Greeter", "tap");
        let runtime = dispatcher.runtimes().create();

        let unbound_wave = CustomId::independent(wave, "").unwrap().encode();
        let bound_tap = CustomId::bound(tap.clone(), runtime.id(), "").unwrap().encode();
        for custom_id in [unbound_wave, bound_tap] {
            let outcome = dispatcher.dispatch(Interaction::component(2, alice(), custom_id)).await;
            assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::BindingMismatch));
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.runtimes().len(), 1);

        let independent_tap = CustomId::independent(tap, "").unwrap().encode();
        let outcome = dispatcher.dispatch(Interaction::component(3, alice(), independent_tap)).await;
        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(rx.recv().await.unwrap().reply, ReplyIntent::text("tapped"));
    }

    #[tokio::test]
    async fn test_runtime_closed_while_waiting_is_dropped() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let dispatcher = dispatcher(sink);

        dispatcher.dispatch(Interaction::slash(1, alice(), "ping", vec![])).await;
        let button = rx.recv().await.unwrap().reply.as_message().unwrap().components[0].clone();
        let runtime_id = CustomId::decode(&button).unwrap().runtime_id().unwrap();
        let runtime = dispatcher.runtimes().get(runtime_id).unwrap();

        let guard = runtime.lock_scope().await;
        let mut click = tokio_test::task::spawn(dispatcher.dispatch(Interaction::component(2, alice(), button)));
        tokio_test::assert_pending!(click.poll());

        assert!(dispatcher.runtimes().close(runtime_id));
        drop(guard);
        tokio_test::assert_ready_eq!(click.poll(), DispatchOutcome::Dropped(DropReason::StaleRuntime));
        assert!(rx.try_recv().is_err());
    }
}
