//! Entity resolution for snowflake option values.

use std::collections::HashMap;

use parking_lot::RwLock;
use switchyard_core::{Channel, Member, Role, Snowflake, User};

/// Looks up platform entities referenced by id.
///
/// Usually backed by the host's gateway cache. Returning `None` makes the adapter
/// reject the value.
pub trait EntityResolver: Send + Sync {
    fn user(&self, id: Snowflake) -> Option<User>;
    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member>;
    fn channel(&self, id: Snowflake) -> Option<Channel>;
    fn role(&self, guild_id: Snowflake, id: Snowflake) -> Option<Role>;
}

/// Resolves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEntities;

impl EntityResolver for NoEntities {
    fn user(&self, _id: Snowflake) -> Option<User> {
        None
    }

    fn member(&self, _guild_id: Snowflake, _user_id: Snowflake) -> Option<Member> {
        None
    }

    fn channel(&self, _id: Snowflake) -> Option<Channel> {
        None
    }

    fn role(&self, _guild_id: Snowflake, _id: Snowflake) -> Option<Role> {
        None
    }
}

/// In-memory entity cache.
#[derive(Debug, Default)]
pub struct EntityCache {
    users: RwLock<HashMap<Snowflake, User>>,
    members: RwLock<HashMap<(Snowflake, Snowflake), Member>>,
    channels: RwLock<HashMap<Snowflake, Channel>>,
    roles: RwLock<HashMap<(Snowflake, Snowflake), Role>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    /// Caches the member and its user.
    pub fn insert_member(&self, member: Member) {
        self.insert_user(member.user.clone());
        self.members
            .write()
            .insert((member.guild_id, member.user.id), member);
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.channels.write().insert(channel.id, channel);
    }

    pub fn insert_role(&self, role: Role) {
        self.roles.write().insert((role.guild_id, role.id), role);
    }
}

impl EntityResolver for EntityCache {
    fn user(&self, id: Snowflake) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.members.read().get(&(guild_id, user_id)).cloned()
    }

    fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.channels.read().get(&id).cloned()
    }

    fn role(&self, guild_id: Snowflake, id: Snowflake) -> Option<Role> {
        self.roles.read().get(&(guild_id, id)).cloned()
    }
}
