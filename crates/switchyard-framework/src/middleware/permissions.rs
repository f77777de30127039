use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::{Member, User};
use tracing::debug;

use super::Middleware;
use crate::context::InvocationContext;
use crate::reply::ErrorReplies;

/// Decides whether the invoking user holds the permissions a definition requires.
pub trait PermissionsProvider: Send + Sync {
    /// Called for interactions inside a guild.
    fn has_member_permission(&self, member: &Member, required: &[String], ctx: &InvocationContext) -> bool;

    /// Called for interactions outside a guild.
    fn has_user_permission(&self, user: &User, required: &[String], ctx: &InvocationContext) -> bool;
}

/// Compares the member's granted permissions with the required ones. Outside a
/// guild nothing is granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPermissionsProvider;

impl PermissionsProvider for DefaultPermissionsProvider {
    fn has_member_permission(&self, member: &Member, required: &[String], _ctx: &InvocationContext) -> bool {
        required
            .iter()
            .all(|permission| member.has_permission(permission))
    }

    fn has_user_permission(&self, _user: &User, required: &[String], _ctx: &InvocationContext) -> bool {
        required.is_empty()
    }
}

/// Cancels invocations whose user lacks the definition's required permissions.
pub struct PermissionsMiddleware {
    provider: Arc<dyn PermissionsProvider>,
    replies: Arc<dyn ErrorReplies>,
}

impl PermissionsMiddleware {
    pub fn new(provider: Arc<dyn PermissionsProvider>, replies: Arc<dyn ErrorReplies>) -> Self {
        Self { provider, replies }
    }
}

#[async_trait]
impl Middleware for PermissionsMiddleware {
    async fn handle(&self, ctx: &mut InvocationContext) {
        let required = ctx.definition().permissions();
        if required.is_empty() {
            return;
        }

        let interaction = ctx.interaction();
        let allowed = match &interaction.member {
            Some(member) => self.provider.has_member_permission(member, required, ctx),
            None => self.provider.has_user_permission(&interaction.user, required, ctx),
        };
        if !allowed {
            debug!(
                user_id = interaction.user.id,
                definition_id = %ctx.definition().id(),
                ?required,
                "Insufficient permissions"
            );
            let reply = self.replies.insufficient_permissions(ctx);
            ctx.cancel_with(reply);
        }
    }

    fn name(&self) -> &str {
        "permissions"
    }
}
