//! Dispatch payloads
//!
//! Shapes of dispatch `d` fields that are not plain entities from `chat-core`.

use chat_core::{Member, Snowflake, UnavailableGuild, User};
use serde::{Deserialize, Serialize};

/// READY payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Gateway protocol version
    #[serde(default)]
    pub v: u8,
    pub user: User,
    /// Guilds the session will receive GUILD_CREATE for
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
}

/// GUILD_DELETE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildDeletePayload {
    pub id: Snowflake,
    /// Set when the guild went down rather than being left
    #[serde(default)]
    pub unavailable: bool,
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeletePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// GUILD_MEMBER_ADD and GUILD_MEMBER_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberPayload {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: Member,
}

impl GuildMemberPayload {
    /// The member with its guild ID filled in
    #[must_use]
    pub fn into_member(self) -> Member {
        let mut member = self.member;
        member.guild_id = Some(self.guild_id);
        member
    }
}

/// GUILD_MEMBER_REMOVE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberRemovePayload {
    pub guild_id: Snowflake,
    pub user: User,
}

/// GUILD_MEMBERS_CHUNK payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMembersChunkPayload {
    pub guild_id: Snowflake,
    pub members: Vec<Member>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    /// User IDs that were requested but not found
    #[serde(default)]
    pub not_found: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// GUILD_SCHEDULED_EVENT_USER_ADD and _REMOVE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEventUserPayload {
    pub guild_scheduled_event_id: Snowflake,
    pub user_id: Snowflake,
    pub guild_id: Snowflake,
}

/// TYPING_START payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStartPayload {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix time in seconds
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
}
