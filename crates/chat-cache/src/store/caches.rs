//! Aggregate of all entity caches kept by a client

use super::{CacheStore, GroupedCache};
use bitflags::bitflags;
use chat_core::{Channel, Guild, Member, Message, Snowflake, StageInstance, User};
use dashmap::DashSet;
use parking_lot::RwLock;

bitflags! {
    /// Which entity caches are populated
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CacheFlags: u32 {
        const GUILDS          = 1 << 0;
        const CHANNELS        = 1 << 1;
        const MEMBERS         = 1 << 2;
        const MESSAGES        = 1 << 3;
        const STAGE_INSTANCES = 1 << 4;

        /// Everything except messages, which grow without bound
        const DEFAULT = Self::GUILDS.bits()
            | Self::CHANNELS.bits()
            | Self::MEMBERS.bits()
            | Self::STAGE_INSTANCES.bits();
    }
}

impl Default for CacheFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn cache_for<V: Clone>(flags: CacheFlags, flag: CacheFlags) -> GroupedCache<V> {
    if flags.contains(flag) {
        GroupedCache::new()
    } else {
        GroupedCache::disabled()
    }
}

/// All caches of one client, shared by every shard
///
/// Scopes: guilds by their own ID, channels/members/stage instances by guild ID,
/// messages by channel ID. DM channels use `Snowflake::default()` as scope.
pub struct Caches {
    flags: CacheFlags,
    self_user: RwLock<Option<User>>,
    unavailable_guilds: DashSet<Snowflake>,
    guilds: GroupedCache<Guild>,
    channels: GroupedCache<Channel>,
    members: GroupedCache<Member>,
    messages: GroupedCache<Message>,
    stage_instances: GroupedCache<StageInstance>,
}

impl Caches {
    /// Create caches for the given flags
    #[must_use]
    pub fn new(flags: CacheFlags) -> Self {
        Self {
            flags,
            self_user: RwLock::new(None),
            unavailable_guilds: DashSet::new(),
            guilds: cache_for(flags, CacheFlags::GUILDS),
            channels: cache_for(flags, CacheFlags::CHANNELS),
            members: cache_for(flags, CacheFlags::MEMBERS),
            messages: cache_for(flags, CacheFlags::MESSAGES),
            stage_instances: cache_for(flags, CacheFlags::STAGE_INSTANCES),
        }
    }

    pub fn flags(&self) -> CacheFlags {
        self.flags
    }

    /// The user this client is logged in as (set on READY)
    pub fn self_user(&self) -> Option<User> {
        self.self_user.read().clone()
    }

    pub fn set_self_user(&self, user: User) {
        *self.self_user.write() = Some(user);
    }

    pub fn guilds(&self) -> &GroupedCache<Guild> {
        &self.guilds
    }

    pub fn channels(&self) -> &GroupedCache<Channel> {
        &self.channels
    }

    pub fn members(&self) -> &GroupedCache<Member> {
        &self.members
    }

    pub fn messages(&self) -> &GroupedCache<Message> {
        &self.messages
    }

    pub fn stage_instances(&self) -> &GroupedCache<StageInstance> {
        &self.stage_instances
    }

    /// Look up a guild by ID
    pub fn guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.guilds.get(guild_id, guild_id)
    }

    /// Record a guild as announced but not yet available
    pub fn mark_unavailable(&self, guild_id: Snowflake) {
        self.unavailable_guilds.insert(guild_id);
    }

    /// Clear the unavailable mark, returning whether it was set
    pub fn take_unavailable(&self, guild_id: Snowflake) -> bool {
        self.unavailable_guilds.remove(&guild_id).is_some()
    }

    pub fn is_unavailable(&self, guild_id: Snowflake) -> bool {
        self.unavailable_guilds.contains(&guild_id)
    }

    /// Remove a guild and everything scoped to it
    pub fn purge_guild(&self, guild_id: Snowflake) -> Option<Guild> {
        for channel in self.channels.scope_values(guild_id) {
            self.messages.remove_scope(channel.id);
        }
        let channels = self.channels.remove_scope(guild_id);
        let members = self.members.remove_scope(guild_id);
        self.stage_instances.remove_scope(guild_id);
        self.unavailable_guilds.remove(&guild_id);

        tracing::trace!(
            guild_id = %guild_id,
            channels,
            members,
            "Purged guild from cache"
        );

        self.guilds.remove(guild_id, guild_id)
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(CacheFlags::default())
    }
}

impl std::fmt::Debug for Caches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caches")
            .field("flags", &self.flags)
            .field("guilds", &self.guilds.len())
            .field("channels", &self.channels.len())
            .field("members", &self.members.len())
            .field("messages", &self.messages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::ChannelType;

    fn guild(id: u64) -> Guild {
        serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "name": "g",
            "owner_id": "1"
        }))
        .unwrap()
    }

    fn channel(id: u64, guild_id: u64) -> Channel {
        Channel {
            id: Snowflake::new(id),
            channel_type: ChannelType::GuildText,
            guild_id: Some(Snowflake::new(guild_id)),
            name: Some("general".to_string()),
            topic: None,
            position: 0,
            parent_id: None,
        }
    }

    #[test]
    fn test_default_flags_skip_messages() {
        let caches = Caches::default();
        assert!(caches.guilds().is_enabled());
        assert!(!caches.messages().is_enabled());
    }

    #[test]
    fn test_unavailable_tracking() {
        let caches = Caches::default();
        let id = Snowflake::new(5);
        caches.mark_unavailable(id);
        assert!(caches.is_unavailable(id));
        assert!(caches.take_unavailable(id));
        assert!(!caches.take_unavailable(id));
    }

    #[test]
    fn test_purge_guild() {
        let caches = Caches::new(CacheFlags::all());
        let gid = Snowflake::new(1);
        caches.guilds().put(gid, gid, guild(1));
        caches.channels().put(gid, Snowflake::new(10), channel(10, 1));
        caches.channels().put(Snowflake::new(2), Snowflake::new(20), channel(20, 2));

        let purged = caches.purge_guild(gid);
        assert_eq!(purged.map(|g| g.id), Some(gid));
        assert!(caches.guild(gid).is_none());
        assert!(caches.channels().get(gid, Snowflake::new(10)).is_none());
        assert!(caches.channels().get(Snowflake::new(2), Snowflake::new(20)).is_some());
    }
}
