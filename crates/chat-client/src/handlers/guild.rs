//! Guild, stage instance and scheduled event subscription handlers

use super::HandlerContext;
use crate::events::{EventKind, GuildDeletePayload, ScheduledEventUserPayload};
use chat_cache::CacheStore;
use chat_core::{Guild, StageInstance};

pub(super) fn on_guild_create(ctx: &HandlerContext<'_>, mut guild: Guild) {
    let caches = ctx.caches();
    let (channels, members) = guild.take_children();

    for channel in channels {
        caches.channels().put(guild.id, channel.id, channel);
    }
    for member in members {
        caches.members().put(guild.id, member.user.id, member);
    }
    caches.guilds().put(guild.id, guild.id, guild.clone());

    if caches.take_unavailable(guild.id) {
        ctx.dispatch(EventKind::GuildReady(guild));
    } else {
        tracing::debug!(shard_id = ctx.shard_id(), guild_id = %guild.id, "Joined guild");
        ctx.dispatch(EventKind::GuildJoin(guild));
    }
}

pub(super) fn on_guild_update(ctx: &HandlerContext<'_>, guild: Guild) {
    let old = ctx.caches().guilds().put(guild.id, guild.id, guild.clone());
    ctx.dispatch(EventKind::GuildUpdate { guild, old });
}

pub(super) fn on_guild_delete(ctx: &HandlerContext<'_>, payload: GuildDeletePayload) {
    let caches = ctx.caches();
    let guild_id = payload.id;

    if payload.unavailable {
        caches.mark_unavailable(guild_id);
        tracing::debug!(shard_id = ctx.shard_id(), guild_id = %guild_id, "Guild unavailable");
        ctx.dispatch(EventKind::GuildUnavailable { guild_id });
    } else {
        let guild = caches.purge_guild(guild_id);
        tracing::debug!(shard_id = ctx.shard_id(), guild_id = %guild_id, "Left guild");
        ctx.dispatch(EventKind::GuildLeave { guild_id, guild });
    }
}

pub(super) fn on_stage_instance_create(ctx: &HandlerContext<'_>, stage: StageInstance) {
    ctx.caches()
        .stage_instances()
        .put(stage.guild_id, stage.id, stage.clone());
    ctx.dispatch(EventKind::StageInstanceCreate(stage));
}

pub(super) fn on_stage_instance_update(ctx: &HandlerContext<'_>, stage: StageInstance) {
    let old = ctx
        .caches()
        .stage_instances()
        .put(stage.guild_id, stage.id, stage.clone());
    ctx.dispatch(EventKind::StageInstanceUpdate {
        stage_instance: stage,
        old,
    });
}

pub(super) fn on_stage_instance_delete(ctx: &HandlerContext<'_>, stage: StageInstance) {
    ctx.caches().stage_instances().remove(stage.guild_id, stage.id);
    ctx.dispatch(EventKind::StageInstanceDelete(stage));
}

pub(super) fn on_scheduled_event_user_add(
    ctx: &HandlerContext<'_>,
    payload: ScheduledEventUserPayload,
) {
    ctx.dispatch(EventKind::GuildScheduledEventUserAdd(payload));
}

pub(super) fn on_scheduled_event_user_remove(
    ctx: &HandlerContext<'_>,
    payload: ScheduledEventUserPayload,
) {
    ctx.dispatch(EventKind::GuildScheduledEventUserRemove(payload));
}
