//! Events delivered to listeners

use super::payloads::{ScheduledEventUserPayload, TypingStartPayload};
use crate::client::Client;
use chat_core::{Channel, Guild, Member, Message, Snowflake, StageInstance, User};
use std::sync::{Arc, Weak};

/// Context shared by every event: where it came from and which client handled it
///
/// Holds the client weakly; an event never keeps its client alive.
#[derive(Debug, Clone)]
pub struct GenericEvent {
    client: Weak<Client>,
    shard_id: u32,
    sequence: u64,
}

impl GenericEvent {
    #[must_use]
    pub fn new(client: &Arc<Client>, shard_id: u32, sequence: u64) -> Self {
        Self {
            client: Arc::downgrade(client),
            shard_id,
            sequence,
        }
    }

    /// The client, if it is still alive
    pub fn client(&self) -> Option<Arc<Client>> {
        self.client.upgrade()
    }

    pub const fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Sequence number of the dispatch frame this event was derived from
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// An event with its context
#[derive(Debug, Clone)]
pub struct Event {
    pub context: GenericEvent,
    pub kind: EventKind,
}

impl Event {
    #[must_use]
    pub fn new(context: GenericEvent, kind: EventKind) -> Self {
        Self { context, kind }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub const fn shard_id(&self) -> u32 {
        self.context.shard_id
    }

    pub const fn sequence(&self) -> u64 {
        self.context.sequence
    }
}

/// Everything a listener can observe
///
/// Update and delete variants carry the previously cached value when one existed.
#[derive(Debug, Clone)]
pub enum EventKind {
    Ready {
        user: User,
        session_id: String,
        guild_ids: Vec<Snowflake>,
        resume_gateway_url: Option<String>,
    },
    Resumed,

    /// A guild announced in READY became available
    GuildReady(Guild),
    /// The client was added to a guild
    GuildJoin(Guild),
    GuildUpdate {
        guild: Guild,
        old: Option<Guild>,
    },
    /// A guild went down; it stays joined
    GuildUnavailable {
        guild_id: Snowflake,
    },
    /// The client left or was removed from a guild
    GuildLeave {
        guild_id: Snowflake,
        guild: Option<Guild>,
    },

    ChannelCreate(Channel),
    ChannelUpdate {
        channel: Channel,
        old: Option<Channel>,
    },
    ChannelDelete(Channel),

    MessageCreate(Message),
    MessageUpdate {
        message: Message,
        old: Option<Message>,
    },
    MessageDelete {
        message_id: Snowflake,
        channel_id: Snowflake,
        guild_id: Option<Snowflake>,
        message: Option<Message>,
    },

    GuildMemberJoin(Member),
    GuildMemberUpdate {
        member: Member,
        old: Option<Member>,
    },
    GuildMemberLeave {
        guild_id: Snowflake,
        user: User,
        member: Option<Member>,
    },
    /// One member out of a GUILD_MEMBERS_CHUNK
    GuildMemberLoaded(Member),
    /// Sent after every member of the chunk was delivered
    GuildMembersChunk {
        guild_id: Snowflake,
        chunk_index: u32,
        chunk_count: u32,
        member_ids: Vec<Snowflake>,
        not_found: Vec<Snowflake>,
        nonce: Option<String>,
    },

    StageInstanceCreate(StageInstance),
    StageInstanceUpdate {
        stage_instance: StageInstance,
        old: Option<StageInstance>,
    },
    StageInstanceDelete(StageInstance),

    GuildScheduledEventUserAdd(ScheduledEventUserPayload),
    GuildScheduledEventUserRemove(ScheduledEventUserPayload),

    TypingStart(TypingStartPayload),
}

impl EventKind {
    /// Event name used in logs and error reports
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::Resumed => "Resumed",
            Self::GuildReady(_) => "GuildReady",
            Self::GuildJoin(_) => "GuildJoin",
            Self::GuildUpdate { .. } => "GuildUpdate",
            Self::GuildUnavailable { .. } => "GuildUnavailable",
            Self::GuildLeave { .. } => "GuildLeave",
            Self::ChannelCreate(_) => "ChannelCreate",
            Self::ChannelUpdate { .. } => "ChannelUpdate",
            Self::ChannelDelete(_) => "ChannelDelete",
            Self::MessageCreate(_) => "MessageCreate",
            Self::MessageUpdate { .. } => "MessageUpdate",
            Self::MessageDelete { .. } => "MessageDelete",
            Self::GuildMemberJoin(_) => "GuildMemberJoin",
            Self::GuildMemberUpdate { .. } => "GuildMemberUpdate",
            Self::GuildMemberLeave { .. } => "GuildMemberLeave",
            Self::GuildMemberLoaded(_) => "GuildMemberLoaded",
            Self::GuildMembersChunk { .. } => "GuildMembersChunk",
            Self::StageInstanceCreate(_) => "StageInstanceCreate",
            Self::StageInstanceUpdate { .. } => "StageInstanceUpdate",
            Self::StageInstanceDelete(_) => "StageInstanceDelete",
            Self::GuildScheduledEventUserAdd(_) => "GuildScheduledEventUserAdd",
            Self::GuildScheduledEventUserRemove(_) => "GuildScheduledEventUserRemove",
            Self::TypingStart(_) => "TypingStart",
        }
    }

    /// Guild the event belongs to, if any
    #[must_use]
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::GuildReady(guild) | Self::GuildJoin(guild) | Self::GuildUpdate { guild, .. } => {
                Some(guild.id)
            }
            Self::GuildUnavailable { guild_id }
            | Self::GuildLeave { guild_id, .. }
            | Self::GuildMemberLeave { guild_id, .. }
            | Self::GuildMembersChunk { guild_id, .. } => Some(*guild_id),
            Self::ChannelCreate(channel)
            | Self::ChannelDelete(channel)
            | Self::ChannelUpdate { channel, .. } => channel.guild_id,
            Self::MessageCreate(message) | Self::MessageUpdate { message, .. } => message.guild_id,
            Self::MessageDelete { guild_id, .. } => *guild_id,
            Self::GuildMemberJoin(member)
            | Self::GuildMemberLoaded(member)
            | Self::GuildMemberUpdate { member, .. } => member.guild_id,
            Self::StageInstanceCreate(stage)
            | Self::StageInstanceDelete(stage)
            | Self::StageInstanceUpdate {
                stage_instance: stage,
                ..
            } => Some(stage.guild_id),
            Self::GuildScheduledEventUserAdd(payload)
            | Self::GuildScheduledEventUserRemove(payload) => Some(payload.guild_id),
            Self::TypingStart(payload) => payload.guild_id,
            Self::Ready { .. } | Self::Resumed => None,
        }
    }
}
