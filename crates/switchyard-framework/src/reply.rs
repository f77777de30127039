//! Outbound seams: failure replies and reply delivery.
//!
//! The dispatcher never renders anything. Replies leave through a [`ReplySink`], and
//! every reply the framework produces on its own (adaptation failures, failed
//! constraints, missing permissions, cooldowns, handler failures) comes from an
//! [`ErrorReplies`] implementation. [`DefaultErrorReplies`] answers with ephemeral,
//! keyed messages that the host localizes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use switchyard_core::{Interaction, ReplyIntent};
use tokio::sync::mpsc;
use tracing::trace;

use crate::adapter::AdaptationFailure;
use crate::context::InvocationContext;
use crate::error::DeliveryError;
use crate::validation::ValidationFailure;

/// Message keys used by [`DefaultErrorReplies`].
pub mod keys {
    pub const ADAPTATION_FAILED: &str = "switchyard.error.adaptation-failed";
    pub const INSUFFICIENT_PERMISSIONS: &str = "switchyard.error.insufficient-permissions";
    pub const COOLDOWN: &str = "switchyard.error.cooldown";
    pub const EXECUTION_FAILED: &str = "switchyard.error.execution-failed";
}

/// Builds the replies the framework sends when it stops an invocation.
pub trait ErrorReplies: Send + Sync {
    /// One or more options could not be parsed.
    fn adaptation_failed(&self, ctx: &InvocationContext, failures: &[AdaptationFailure]) -> ReplyIntent;

    /// A constraint failed.
    fn constraint_failed(&self, ctx: &InvocationContext, failure: &ValidationFailure) -> ReplyIntent;

    fn insufficient_permissions(&self, ctx: &InvocationContext) -> ReplyIntent;

    /// The user is on cooldown for `remaining`.
    fn cooldown(&self, ctx: &InvocationContext, remaining: Duration) -> ReplyIntent;

    /// The handler returned an error or panicked.
    fn execution_failed(&self, ctx: &InvocationContext) -> ReplyIntent;
}

/// Ephemeral keyed replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorReplies;

impl ErrorReplies for DefaultErrorReplies {
    fn adaptation_failed(&self, _ctx: &InvocationContext, failures: &[AdaptationFailure]) -> ReplyIntent {
        let options = failures
            .iter()
            .map(|failure| failure.option.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        ReplyIntent::key_with_args(keys::ADAPTATION_FAILED, [("options", options)]).ephemeral()
    }

    fn constraint_failed(&self, _ctx: &InvocationContext, failure: &ValidationFailure) -> ReplyIntent {
        ReplyIntent::key_with_args(failure.message_key.clone(), [("option", failure.option.clone())])
            .ephemeral()
    }

    fn insufficient_permissions(&self, ctx: &InvocationContext) -> ReplyIntent {
        let required = ctx.definition().permissions().join(", ");
        ReplyIntent::key_with_args(keys::INSUFFICIENT_PERMISSIONS, [("permissions", required)])
            .ephemeral()
    }

    fn cooldown(&self, _ctx: &InvocationContext, remaining: Duration) -> ReplyIntent {
        let seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        ReplyIntent::key_with_args(keys::COOLDOWN, [("seconds", seconds.to_string())]).ephemeral()
    }

    fn execution_failed(&self, _ctx: &InvocationContext) -> ReplyIntent {
        ReplyIntent::key(keys::EXECUTION_FAILED).ephemeral()
    }
}

/// Delivers replies to the platform.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, interaction: &Interaction, reply: ReplyIntent) -> Result<(), DeliveryError>;
}

/// Discards every reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReplySink;

#[async_trait]
impl ReplySink for NoopReplySink {
    async fn deliver(&self, interaction: &Interaction, _reply: ReplyIntent) -> Result<(), DeliveryError> {
        trace!(interaction_id = interaction.id, "Reply discarded");
        Ok(())
    }
}

/// A reply together with the interaction it answers.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub interaction: Arc<Interaction>,
    pub reply: ReplyIntent,
}

/// Forwards replies into an unbounded channel, e.g. to a writer task.
#[derive(Debug, Clone)]
pub struct ChannelReplySink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelReplySink {
    pub fn new(tx: mpsc::UnboundedSender<Delivery>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl ReplySink for ChannelReplySink {
    async fn deliver(&self, interaction: &Interaction, reply: ReplyIntent) -> Result<(), DeliveryError> {
        self.tx
            .send(Delivery {
                interaction: Arc::new(interaction.clone()),
                reply,
            })
            .map_err(|_| DeliveryError::new("reply channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_for;
    use switchyard_core::{InteractionDescriptor, User};

    fn ctx() -> InvocationContext {
        context_for(
            InteractionDescriptor::slash_command("Mod", "ban", "ban").permissions(["BAN_MEMBERS"]),
            Interaction::slash(1, User::new(1, "alice"), "ban", vec![]),
        )
    }

    #[test]
    fn test_default_replies_are_keyed_and_ephemeral() {
        let ctx = ctx();
        let replies = DefaultErrorReplies;

        let reply = replies.insufficient_permissions(&ctx);
        assert_eq!(reply.message_key(), Some(keys::INSUFFICIENT_PERMISSIONS));
        assert!(reply.as_message().unwrap().ephemeral);

        let reply = replies.cooldown(&ctx, Duration::from_millis(1500));
        match &reply.as_message().unwrap().content {
            switchyard_core::MessageContent::Key { args, .. } => {
                assert_eq!(args, &[("seconds".to_string(), "2".to_string())]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let failure = ValidationFailure {
            option: "amount".into(),
            constraint: "min".into(),
            message_key: "amount.too-small".into(),
        };
        assert_eq!(replies.constraint_failed(&ctx, &failure).message_key(), Some("amount.too-small"));
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_replies() {
        let (sink, mut rx) = ChannelReplySink::channel();
        let interaction = Interaction::slash(5, User::new(1, "alice"), "ping", vec![]);
        sink.deliver(&interaction, ReplyIntent::text("pong")).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.interaction.id, 5);
        assert_eq!(delivery.reply, ReplyIntent::text("pong"));

        drop(rx);
        assert!(sink.deliver(&interaction, ReplyIntent::text("late")).await.is_err());
    }
}
