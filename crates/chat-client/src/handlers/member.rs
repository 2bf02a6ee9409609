//! Guild member handlers

use super::HandlerContext;
use crate::events::{
    EventKind, GuildMemberPayload, GuildMemberRemovePayload, GuildMembersChunkPayload,
};
use chat_cache::CacheStore;
use chat_core::Snowflake;

// Keep the cached guild's member count in step with joins and leaves
fn adjust_member_count(ctx: &HandlerContext<'_>, guild_id: Snowflake, joined: bool) {
    let guilds = ctx.caches().guilds();
    let Some(mut guild) = guilds.get(guild_id, guild_id) else {
        return;
    };
    if let Some(count) = guild.member_count.as_mut() {
        *count = if joined {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
        guilds.put(guild_id, guild_id, guild);
    }
}

pub(super) fn on_member_add(ctx: &HandlerContext<'_>, payload: GuildMemberPayload) {
    let guild_id = payload.guild_id;
    let member = payload.into_member();

    ctx.caches()
        .members()
        .put(guild_id, member.user.id, member.clone());
    adjust_member_count(ctx, guild_id, true);

    ctx.dispatch(EventKind::GuildMemberJoin(member));
}

pub(super) fn on_member_update(ctx: &HandlerContext<'_>, payload: GuildMemberPayload) {
    let guild_id = payload.guild_id;
    let member = payload.into_member();

    let old = ctx
        .caches()
        .members()
        .put(guild_id, member.user.id, member.clone());

    ctx.dispatch(EventKind::GuildMemberUpdate { member, old });
}

pub(super) fn on_member_remove(ctx: &HandlerContext<'_>, payload: GuildMemberRemovePayload) {
    let member = ctx
        .caches()
        .members()
        .remove(payload.guild_id, payload.user.id);
    adjust_member_count(ctx, payload.guild_id, false);

    ctx.dispatch(EventKind::GuildMemberLeave {
        guild_id: payload.guild_id,
        user: payload.user,
        member,
    });
}

/// One `GuildMemberLoaded` per member in payload order, then the aggregate chunk event
pub(super) fn on_members_chunk(ctx: &HandlerContext<'_>, payload: GuildMembersChunkPayload) {
    let guild_id = payload.guild_id;
    let members = ctx.caches().members();
    let mut member_ids = Vec::with_capacity(payload.members.len());

    for mut member in payload.members {
        member.guild_id = Some(guild_id);
        member_ids.push(member.user.id);
        members.put(guild_id, member.user.id, member.clone());
        ctx.dispatch(EventKind::GuildMemberLoaded(member));
    }

    tracing::trace!(
        shard_id = ctx.shard_id(),
        guild_id = %guild_id,
        chunk = payload.chunk_index,
        of = payload.chunk_count,
        members = member_ids.len(),
        "Member chunk received"
    );

    ctx.dispatch(EventKind::GuildMembersChunk {
        guild_id,
        chunk_index: payload.chunk_index,
        chunk_count: payload.chunk_count,
        member_ids,
        not_found: payload.not_found,
        nonce: payload.nonce,
    });
}
