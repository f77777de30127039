//! End-to-end scenarios: routing, runtime lifecycle, middleware, argument adaptation
//! and failure handling, driven through the public API only.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use parking_lot::Mutex;
use switchyard::core::{
    AutoCompleteRule, Choice, Constraint, ContextTarget, CustomId, DefinitionRegistry,
    Interaction, InteractionDescriptor, InteractionKind, Member, MessageContent, ModalField,
    OptionDefinition, OptionType, RawOption, RawValue, ReplyIntent, TextInputDefinition, User,
};
use switchyard::framework::reply::keys;
use switchyard::framework::{
    ChannelReplySink, Controller, ControllerRegistry, Delivery, DispatchOutcome, Dispatcher,
    DispatcherBuilder, DropReason, HandlerResult, InvocationContext, Priority, async_trait,
    middleware_fn,
};
use switchyard::runtime::{SwitchyardConfig, SwitchyardHost};
use tokio::sync::mpsc::UnboundedReceiver;

// =============================================================================
// Fixtures
// =============================================================================

struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc::now()),
        })
    }

    fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Set by middleware, read by the `whoami` handler.
struct Tier(&'static str);

struct Shop {
    calls: Arc<AtomicUsize>,
    clicks: u32,
}

#[async_trait]
impl Controller for Shop {
    async fn invoke(&mut self, method: &str, ctx: &mut InvocationContext) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            "ping" => {
                let click = ctx.bound_custom_id("Shop", "click", "")?;
                let close = ctx.bound_custom_id("Shop", "close", "")?;
                Ok(Some(
                    ReplyIntent::text("pong")
                        .with_component(&click)
                        .with_component(&close),
                ))
            }
            "click" | "pick" => {
                self.clicks += 1;
                Ok(Some(ReplyIntent::text(self.clicks.to_string())))
            }
            "close" => {
                ctx.close_runtime();
                Ok(Some(ReplyIntent::text("closed")))
            }
            "buy" => {
                let amount: i64 = ctx.arguments().require("amount")?;
                Ok(Some(ReplyIntent::text(format!("bought {amount}"))))
            }
            "price" => {
                let price: f64 = ctx.arguments().require("price")?;
                Ok(Some(ReplyIntent::text(format!("{price:.1}"))))
            }
            "order" => Ok(Some(ReplyIntent::text("ordered"))),
            "menu" => {
                let pick = ctx.independent_custom_id("Shop", "pick", "red")?;
                Ok(Some(ReplyIntent::text("menu").with_component(&pick)))
            }
            "feedback" => {
                let submit = ctx.bound_custom_id("Shop", "submit", "")?;
                let input = TextInputDefinition::new("text", "Your feedback");
                Ok(Some(ReplyIntent::modal(&submit, "Feedback", vec![input])))
            }
            "submit" => {
                let text: String = ctx.arguments().require("text")?;
                Ok(Some(ReplyIntent::text(format!("thanks: {text}"))))
            }
            "suggest" => {
                let InteractionKind::AutoComplete { focused, .. } = &ctx.interaction().kind else {
                    return Ok(None);
                };
                let prefix = match &focused.value {
                    RawValue::String(prefix) => prefix.clone(),
                    _ => String::new(),
                };
                let choices = ["apple", "apricot", "banana"]
                    .into_iter()
                    .filter(|fruit| fruit.starts_with(prefix.as_str()))
                    .map(|fruit| Choice::new(fruit, fruit));
                Ok(Some(ReplyIntent::choices(choices)))
            }
            "inspect" => match &ctx.interaction().kind {
                InteractionKind::ContextCommand {
                    target: ContextTarget::User { user },
                    ..
                } => Ok(Some(ReplyIntent::text(user.name.clone()))),
                _ => Err("inspect needs a user target".into()),
            },
            "whoami" => {
                let tier = ctx.state::<Tier>().map_or("none", |tier| tier.0);
                Ok(Some(ReplyIntent::text(tier)))
            }
            "ban" | "roll" => Ok(Some(ReplyIntent::text("ok"))),
            "fail" => Err("database unavailable".into()),
            "explode" => panic!("kaboom"),
            other => Err(format!("unknown method {other}").into()),
        }
    }
}

fn registry() -> DefinitionRegistry {
    DefinitionRegistry::from_descriptors([
        InteractionDescriptor::slash_command("Shop", "ping", "ping"),
        InteractionDescriptor::button("Shop", "click"),
        InteractionDescriptor::button("Shop", "close"),
        InteractionDescriptor::slash_command("Shop", "buy", "buy").option(
            OptionDefinition::new("amount", OptionType::Integer)
                .constraint(Constraint::min(5.0, "shop.amount.too-small"))
                .constraint(Constraint::max(100.0, "shop.amount.too-large")),
        ),
        InteractionDescriptor::slash_command("Shop", "price", "price")
            .option(OptionDefinition::new("price", OptionType::Number)),
        InteractionDescriptor::slash_command("Shop", "order", "order")
            .option(OptionDefinition::new("quantity", OptionType::Integer))
            .option(OptionDefinition::new("gift", OptionType::Boolean))
            .option(OptionDefinition::new("note", OptionType::String).optional()),
        InteractionDescriptor::slash_command("Shop", "menu", "menu"),
        InteractionDescriptor::button("Shop", "pick").independent(),
        InteractionDescriptor::slash_command("Shop", "feedback", "feedback"),
        InteractionDescriptor::modal(
            "Shop",
            "submit",
            "Feedback",
            [TextInputDefinition::new("text", "Your feedback").length(Some(3), None)],
        ),
        InteractionDescriptor::slash_command("Shop", "search", "search")
            .option(OptionDefinition::new("item", OptionType::String).with_autocomplete()),
        InteractionDescriptor::autocomplete("Shop", "suggest", [AutoCompleteRule::command("search")]),
        InteractionDescriptor::user_context("Shop", "inspect", "Inspect"),
        InteractionDescriptor::slash_command("Shop", "whoami", "whoami"),
        InteractionDescriptor::slash_command("Shop", "ban", "ban").permissions(["BAN_MEMBERS"]),
        InteractionDescriptor::slash_command("Shop", "roll", "roll").cooldown(Duration::from_secs(30)),
        InteractionDescriptor::slash_command("Shop", "fail", "fail"),
        InteractionDescriptor::slash_command("Shop", "explode", "explode"),
    ])
    .unwrap()
}

struct Harness {
    dispatcher: Dispatcher,
    replies: UnboundedReceiver<Delivery>,
    clock: Arc<TestClock>,
    calls: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self::with(|builder| builder)
    }

    fn with(configure: impl FnOnce(DispatcherBuilder) -> DispatcherBuilder) -> Self {
        let (sink, replies) = ChannelReplySink::channel();
        let clock = TestClock::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let controllers = ControllerRegistry::new().register_with("Shop", move || Shop {
            calls: Arc::clone(&counter),
            clicks: 0,
        });
        let builder = Dispatcher::builder(registry())
            .instances(controllers)
            .reply_sink(sink)
            .clock(clock.clone());

        Self {
            dispatcher: configure(builder).build().unwrap(),
            replies,
            clock,
            calls,
        }
    }

    async fn send(&mut self, interaction: Interaction) -> (DispatchOutcome, Option<ReplyIntent>) {
        let outcome = self.dispatcher.dispatch(interaction).await;
        let reply = self.replies.try_recv().ok().map(|delivery| delivery.reply);
        (outcome, reply)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn alice() -> User {
    User::new(1, "alice")
}

fn slash(name: &str, options: Vec<RawOption>) -> Interaction {
    Interaction::slash(100, alice(), name, options)
}

fn click(custom_id: &str) -> Interaction {
    Interaction::component(101, alice(), custom_id)
}

fn components(reply: &ReplyIntent) -> Vec<String> {
    reply.as_message().unwrap().components.clone()
}

fn text(value: &str) -> Option<ReplyIntent> {
    Some(ReplyIntent::text(value))
}

fn key_args(reply: &ReplyIntent) -> Vec<(String, String)> {
    match &reply.as_message().unwrap().content {
        MessageContent::Key { args, .. } => args.clone(),
        MessageContent::Text { .. } => Vec::new(),
    }
}

// =============================================================================
// Runtimes
// =============================================================================

#[tokio::test]
async fn test_command_creates_one_runtime_and_click_touches_it() {
    let mut h = Harness::new();

    let (outcome, reply) = h.send(slash("ping", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(h.dispatcher.runtimes().len(), 1);

    let buttons = components(&reply.unwrap());
    let runtime_id = CustomId::decode(&buttons[0]).unwrap().runtime_id().unwrap();
    let runtime = h.dispatcher.runtimes().get(runtime_id).unwrap();
    let before = runtime.last_active_at();

    h.clock.advance(TimeDelta::minutes(1));
    let (outcome, reply) = h.send(click(&buttons[0])).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(reply, text("1"));
    assert_eq!(runtime.last_active_at(), before + TimeDelta::minutes(1));
    assert_eq!(h.dispatcher.runtimes().len(), 1);
}

#[tokio::test]
async fn test_controller_state_survives_within_runtime_only() {
    let mut h = Harness::new();

    let (_, first) = h.send(slash("ping", vec![])).await;
    let (_, second) = h.send(slash("ping", vec![])).await;
    let first = components(&first.unwrap());
    let second = components(&second.unwrap());

    assert_eq!(h.send(click(&first[0])).await.1, text("1"));
    assert_eq!(h.send(click(&first[0])).await.1, text("2"));
    assert_eq!(h.send(click(&second[0])).await.1, text("1"));
    assert_eq!(h.dispatcher.runtimes().len(), 2);
}

#[tokio::test]
async fn test_closed_runtime_drops_clicks() {
    let mut h = Harness::new();
    let (_, reply) = h.send(slash("ping", vec![])).await;
    let buttons = components(&reply.unwrap());

    let (outcome, reply) = h.send(click(&buttons[1])).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(reply, text("closed"));
    assert!(h.dispatcher.runtimes().is_empty());

    let calls = h.calls();
    let (outcome, reply) = h.send(click(&buttons[0])).await;
    assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::StaleRuntime));
    assert_eq!(reply, None);
    assert_eq!(h.calls(), calls);
    assert!(h.dispatcher.runtimes().is_empty());
    assert_eq!(h.dispatcher.runtimes().stats().created, 1);
}

#[tokio::test]
async fn test_inactive_runtime_expires() {
    let mut h = Harness::new();
    let (_, reply) = h.send(slash("ping", vec![])).await;
    let buttons = components(&reply.unwrap());

    h.clock.advance(TimeDelta::minutes(14));
    assert_eq!(h.dispatcher.runtimes().sweep(), 0);
    assert_eq!(h.send(click(&buttons[0])).await.1, text("1"));

    h.clock.advance(TimeDelta::minutes(16));
    assert_eq!(h.dispatcher.runtimes().sweep(), 1);

    let (outcome, reply) = h.send(click(&buttons[0])).await;
    assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::StaleRuntime));
    assert_eq!(reply, None);
    assert_eq!(h.dispatcher.runtimes().stats().expired, 1);
}

#[tokio::test]
async fn test_independent_components_start_fresh_runtimes() {
    let mut h = Harness::new();
    let (_, reply) = h.send(slash("menu", vec![])).await;
    let pick = components(&reply.unwrap()).remove(0);
    assert!(CustomId::decode(&pick).unwrap().is_independent());

    for _ in 0..2 {
        let (outcome, reply) = h.send(click(&pick)).await;
        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(reply, text("1"));
    }
    assert_eq!(h.dispatcher.runtimes().stats().created, 3);
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_modal_submission_routes_into_issuing_runtime() {
    let mut h = Harness::new();
    let (_, reply) = h.send(slash("feedback", vec![])).await;
    let ReplyIntent::Modal(modal) = reply.unwrap() else {
        panic!("expected a modal");
    };

    let field = |value: &str| {
        vec![ModalField {
            id: "text".into(),
            value: value.into(),
        }]
    };
    let (outcome, reply) = h
        .send(Interaction::modal(102, alice(), &modal.custom_id, field("ok")))
        .await;
    assert_eq!(outcome, DispatchOutcome::Rejected);
    assert_eq!(reply.unwrap().message_key(), Some("switchyard.validation.length"));

    let (outcome, reply) = h
        .send(Interaction::modal(103, alice(), &modal.custom_id, field("great")))
        .await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(reply, text("thanks: great"));
    assert_eq!(h.dispatcher.runtimes().len(), 1);
}

#[tokio::test]
async fn test_autocomplete_answers_with_choices() {
    let mut h = Harness::new();
    let request = Interaction::new(
        104,
        alice(),
        InteractionKind::AutoComplete {
            command: "search".into(),
            focused: RawOption::new("item", RawValue::String("ap".into())),
            options: vec![],
        },
    );

    let (outcome, reply) = h.send(request).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(
        reply,
        Some(ReplyIntent::choices([
            Choice::new("apple", "apple"),
            Choice::new("apricot", "apricot"),
        ]))
    );
    assert!(h.dispatcher.runtimes().is_empty());
}

#[tokio::test]
async fn test_context_command_routes_by_target_kind() {
    let mut h = Harness::new();
    let inspect = Interaction::new(
        105,
        alice(),
        InteractionKind::ContextCommand {
            name: "Inspect".into(),
            target: ContextTarget::User {
                user: User::new(9, "mallory"),
            },
        },
    );
    assert_eq!(h.send(inspect).await, (DispatchOutcome::Completed, text("mallory")));

    let as_message = Interaction::new(
        106,
        alice(),
        InteractionKind::ContextCommand {
            name: "Inspect".into(),
            target: ContextTarget::Message {
                id: 7,
                content: "hello".into(),
            },
        },
    );
    assert_eq!(
        h.send(as_message).await,
        (DispatchOutcome::Dropped(DropReason::UnknownCommand), None)
    );
}

#[tokio::test]
async fn test_garbage_custom_ids_are_dropped() {
    let mut h = Harness::new();
    for custom_id in ["", "nonsense", "a:b:c:d", "zzzz:INDEPENDENT:"] {
        let (outcome, reply) = h.send(click(custom_id)).await;
        assert!(matches!(outcome, DispatchOutcome::Dropped(_)), "{custom_id:?}");
        assert_eq!(reply, None);
    }
    assert_eq!(h.calls(), 0);
    assert!(h.dispatcher.runtimes().is_empty());
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_middleware_runs_by_priority_and_attaches_state() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let record = |name: &'static str| {
        let order = Arc::clone(&order);
        middleware_fn(name, move |_ctx: &mut InvocationContext| order.lock().push(name))
    };
    let mut h = Harness::with(|builder| {
        builder
            .middleware(Priority::Low, record("low"))
            .middleware(Priority::Normal, record("normal"))
            .middleware(Priority::High, record("high"))
            .middleware(
                Priority::High,
                middleware_fn("tier", |ctx: &mut InvocationContext| ctx.set_state(Tier("gold"))),
            )
    });

    assert_eq!(h.send(slash("whoami", vec![])).await.1, text("gold"));
    assert_eq!(*order.lock(), vec!["high", "normal", "low"]);
}

#[tokio::test]
async fn test_cancelling_middleware_stops_the_chain() {
    let later = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&later);
    let mut h = Harness::with(|builder| {
        builder
            .middleware(
                Priority::High,
                middleware_fn("maintenance", |ctx: &mut InvocationContext| {
                    ctx.cancel_with(ReplyIntent::key("shop.maintenance"));
                }),
            )
            .middleware(
                Priority::Low,
                middleware_fn("audit", move |_ctx: &mut InvocationContext| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
    });

    let (outcome, reply) = h.send(slash("ping", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert_eq!(reply.unwrap().message_key(), Some("shop.maintenance"));
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn test_permissions_are_checked_before_the_handler() {
    let mut h = Harness::new();
    let member = |permissions: &[&str]| {
        Member::new(alice(), 10).with_permissions(permissions.iter().copied())
    };

    let (outcome, reply) = h
        .send(slash("ban", vec![]).in_guild(member(&["KICK_MEMBERS"])))
        .await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    let reply = reply.unwrap();
    assert_eq!(reply.message_key(), Some(keys::INSUFFICIENT_PERMISSIONS));
    assert!(reply.as_message().unwrap().ephemeral);

    let (outcome, _) = h.send(slash("ban", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    assert_eq!(h.calls(), 0);

    let (outcome, reply) = h
        .send(slash("ban", vec![]).in_guild(member(&["BAN_MEMBERS"])))
        .await;
    assert_eq!((outcome, reply), (DispatchOutcome::Completed, text("ok")));
}

#[tokio::test]
async fn test_cooldown_rejects_repeated_commands() {
    let mut h = Harness::new();
    assert_eq!(h.send(slash("roll", vec![])).await.0, DispatchOutcome::Completed);

    h.clock.advance(TimeDelta::seconds(10));
    let (outcome, reply) = h.send(slash("roll", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Cancelled);
    let reply = reply.unwrap();
    assert_eq!(reply.message_key(), Some(keys::COOLDOWN));
    assert_eq!(key_args(&reply), vec![("seconds".to_string(), "20".to_string())]);

    let bob = Interaction::slash(107, User::new(2, "bob"), "roll", vec![]);
    assert_eq!(h.send(bob).await.0, DispatchOutcome::Completed);

    h.clock.advance(TimeDelta::seconds(20));
    assert_eq!(h.send(slash("roll", vec![])).await.0, DispatchOutcome::Completed);
}

// =============================================================================
// Arguments
// =============================================================================

#[tokio::test]
async fn test_min_constraint_reports_its_message_key() {
    let mut h = Harness::new();
    let amount = |value: RawValue| vec![RawOption::new("amount", value)];

    let (outcome, reply) = h.send(slash("buy", amount(RawValue::Integer(3)))).await;
    assert_eq!(outcome, DispatchOutcome::Rejected);
    assert_eq!(reply.unwrap().message_key(), Some("shop.amount.too-small"));

    let (_, reply) = h.send(slash("buy", amount(RawValue::Integer(500)))).await;
    assert_eq!(reply.unwrap().message_key(), Some("shop.amount.too-large"));
    assert_eq!(h.calls(), 0);

    let (outcome, reply) = h.send(slash("buy", amount(RawValue::String(" 12 ".into())))).await;
    assert_eq!((outcome, reply), (DispatchOutcome::Completed, text("bought 12")));
}

#[tokio::test]
async fn test_integer_reaches_number_option_through_mapper() {
    let mut h = Harness::new();
    let price = |value: RawValue| vec![RawOption::new("price", value)];

    assert_eq!(h.send(slash("price", price(RawValue::Integer(7)))).await.1, text("7.0"));
    assert_eq!(h.send(slash("price", price(RawValue::String("2.5".into())))).await.1, text("2.5"));
}

#[tokio::test]
async fn test_adaptation_failures_are_bundled() {
    let mut h = Harness::new();
    let options = vec![
        RawOption::new("quantity", RawValue::String("many".into())),
        RawOption::new("gift", RawValue::String("perhaps".into())),
    ];

    let (outcome, reply) = h.send(slash("order", options)).await;
    assert_eq!(outcome, DispatchOutcome::Rejected);
    let reply = reply.unwrap();
    assert_eq!(reply.message_key(), Some(keys::ADAPTATION_FAILED));
    assert_eq!(
        key_args(&reply),
        vec![("options".to_string(), "quantity, gift".to_string())]
    );
    assert_eq!(h.calls(), 0);

    let options = vec![
        RawOption::new("quantity", RawValue::Integer(2)),
        RawOption::new("gift", RawValue::Boolean(true)),
    ];
    assert_eq!(h.send(slash("order", options)).await.1, text("ordered"));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_handler_error_becomes_generic_reply() {
    let mut h = Harness::new();
    let (outcome, reply) = h.send(slash("fail", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(reply.unwrap().message_key(), Some(keys::EXECUTION_FAILED));
}

#[tokio::test]
async fn test_handler_panic_is_contained() {
    let mut h = Harness::new();
    let (outcome, reply) = h.send(slash("explode", vec![])).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(reply.unwrap().message_key(), Some(keys::EXECUTION_FAILED));

    assert_eq!(h.send(slash("ping", vec![])).await.0, DispatchOutcome::Completed);
}

// =============================================================================
// Host
// =============================================================================

#[tokio::test]
async fn test_host_runs_dispatches_on_tasks() {
    let (sink, mut replies) = ChannelReplySink::channel();
    let controllers = ControllerRegistry::new().register_with("Shop", || Shop {
        calls: Arc::new(AtomicUsize::new(0)),
        clicks: 0,
    });
    let host = SwitchyardHost::new(
        Dispatcher::builder(registry()).instances(controllers).reply_sink(sink),
        SwitchyardConfig::default(),
    )
    .unwrap();

    host.start();
    let tasks: Vec<_> = (0..4)
        .map(|id| host.handle(Interaction::slash(id, alice(), "ping", vec![])))
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap(), DispatchOutcome::Completed);
    }
    host.stop().await.unwrap();

    for _ in 0..4 {
        assert_eq!(replies.recv().await.unwrap().reply.as_message().unwrap().components.len(), 2);
    }
    assert_eq!(host.stats().live, 4);
}
