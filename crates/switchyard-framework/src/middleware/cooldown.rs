use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mockable::Clock;
use switchyard_core::{DefinitionId, Snowflake};
use tracing::debug;

use super::Middleware;
use crate::context::InvocationContext;
use crate::reply::ErrorReplies;

/// Entries beyond this count trigger a purge of elapsed cooldowns.
const PURGE_THRESHOLD: usize = 1024;

/// Per-user, per-command cooldowns taken from the command definition.
pub struct CooldownMiddleware {
    active: DashMap<(Snowflake, DefinitionId), DateTime<Utc>>,
    clock: Arc<dyn Clock + Send + Sync>,
    replies: Arc<dyn ErrorReplies>,
}

impl CooldownMiddleware {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, replies: Arc<dyn ErrorReplies>) -> Self {
        Self {
            active: DashMap::new(),
            clock,
            replies,
        }
    }

    /// Drops cooldowns that have already elapsed.
    pub fn purge(&self) {
        let now = self.clock.utc();
        self.active.retain(|_, until| *until > now);
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[async_trait]
impl Middleware for CooldownMiddleware {
    async fn handle(&self, ctx: &mut InvocationContext) {
        let Some(delay) = ctx
            .definition()
            .as_command()
            .and_then(|command| command.cooldown.as_ref())
            .map(|cooldown| cooldown.delay())
        else {
            return;
        };
        let Ok(delay) = TimeDelta::from_std(delay) else {
            return;
        };
        if delay <= TimeDelta::zero() {
            return;
        }

        let now = self.clock.utc();
        let key = (ctx.interaction().user.id, ctx.definition().id().clone());
        let remaining = match self.active.entry(key) {
            Entry::Occupied(slot) if *slot.get() > now => Some(*slot.get() - now),
            Entry::Occupied(mut slot) => {
                slot.insert(now + delay);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(now + delay);
                None
            }
        };

        match remaining {
            Some(remaining) => {
                debug!(
                    user_id = ctx.interaction().user.id,
                    definition_id = %ctx.definition().id(),
                    remaining_ms = remaining.num_milliseconds(),
                    "Command on cooldown"
                );
                let reply = self
                    .replies
                    .cooldown(ctx, remaining.to_std().unwrap_or_default());
                ctx.cancel_with(reply);
            }
            None if self.active.len() > PURGE_THRESHOLD => self.purge(),
            None => {}
        }
    }

    fn name(&self) -> &str {
        "cooldown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_for;
    use crate::manager::tests::ManualClock;
    use crate::reply::{DefaultErrorReplies, keys};
    use std::time::Duration;
    use switchyard_core::{Interaction, InteractionDescriptor, User};

    fn roll(user: u64) -> InvocationContext {
        context_for(
            InteractionDescriptor::slash_command("Dice", "roll", "roll").cooldown(Duration::from_secs(10)),
            Interaction::slash(1, User::new(user, "player"), "roll", vec![]),
        )
    }

    #[tokio::test]
    async fn test_cooldown_per_user() {
        let clock = ManualClock::new();
        let middleware = CooldownMiddleware::new(clock.clone(), Arc::new(DefaultErrorReplies));

        let mut first = roll(1);
        middleware.handle(&mut first).await;
        assert!(!first.is_cancelled());

        let mut again = roll(1);
        middleware.handle(&mut again).await;
        let reply = again.take_cancellation().and_then(|c| c.reply).unwrap();
        assert_eq!(reply.message_key(), Some(keys::COOLDOWN));

        let mut other = roll(2);
        middleware.handle(&mut other).await;
        assert!(!other.is_cancelled());

        clock.advance(TimeDelta::seconds(10));
        let mut later = roll(1);
        middleware.handle(&mut later).await;
        assert!(!later.is_cancelled());
    }

    #[tokio::test]
    async fn test_commands_without_cooldown_are_untracked() {
        let middleware = CooldownMiddleware::new(ManualClock::new(), Arc::new(DefaultErrorReplies));
        let mut ctx = context_for(
            InteractionDescriptor::slash_command("Greeter", "ping", "ping"),
            Interaction::slash(1, User::new(1, "alice"), "ping", vec![]),
        );
        middleware.handle(&mut ctx).await;
        middleware.handle(&mut ctx).await;
        assert!(!ctx.is_cancelled());
        assert!(middleware.is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_elapsed_entries() {
        let clock = ManualClock::new();
        let middleware = CooldownMiddleware::new(clock.clone(), Arc::new(DefaultErrorReplies));
        middleware.handle(&mut roll(1)).await;
        assert_eq!(middleware.len(), 1);
        clock.advance(TimeDelta::seconds(11));
        middleware.purge();
        assert!(middleware.is_empty());
    }
}
