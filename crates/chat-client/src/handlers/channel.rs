//! Channel and typing handlers

use super::HandlerContext;
use crate::events::{EventKind, TypingStartPayload};
use chat_cache::CacheStore;
use chat_core::{Channel, Snowflake};

// DM channels have no guild and share the zero scope
fn scope(channel: &Channel) -> Snowflake {
    channel.guild_id.unwrap_or_default()
}

pub(super) fn on_channel_create(ctx: &HandlerContext<'_>, channel: Channel) {
    ctx.caches()
        .channels()
        .put(scope(&channel), channel.id, channel.clone());
    ctx.dispatch(EventKind::ChannelCreate(channel));
}

pub(super) fn on_channel_update(ctx: &HandlerContext<'_>, channel: Channel) {
    let old = ctx
        .caches()
        .channels()
        .put(scope(&channel), channel.id, channel.clone());
    ctx.dispatch(EventKind::ChannelUpdate { channel, old });
}

pub(super) fn on_channel_delete(ctx: &HandlerContext<'_>, channel: Channel) {
    let caches = ctx.caches();
    caches.channels().remove(scope(&channel), channel.id);
    caches.messages().remove_scope(channel.id);
    ctx.dispatch(EventKind::ChannelDelete(channel));
}

pub(super) fn on_typing_start(ctx: &HandlerContext<'_>, payload: TypingStartPayload) {
    if let (Some(guild_id), Some(member)) = (payload.guild_id, &payload.member) {
        let mut member = member.clone();
        member.guild_id = Some(guild_id);
        ctx.caches().members().put(guild_id, member.user.id, member);
    }
    ctx.dispatch(EventKind::TypingStart(payload));
}
