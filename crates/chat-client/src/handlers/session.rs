//! READY and RESUMED

use super::HandlerContext;
use crate::events::{EventKind, ReadyPayload};
use chat_core::Snowflake;

pub(super) fn on_ready(ctx: &HandlerContext<'_>, payload: ReadyPayload) {
    let caches = ctx.caches();
    caches.set_self_user(payload.user.clone());

    let guild_ids: Vec<Snowflake> = payload.guilds.iter().map(|guild| guild.id).collect();
    for guild_id in &guild_ids {
        caches.mark_unavailable(*guild_id);
    }

    tracing::debug!(
        shard_id = ctx.shard_id(),
        user = %payload.user.tag(),
        guilds = guild_ids.len(),
        "Ready payload processed"
    );

    ctx.dispatch(EventKind::Ready {
        user: payload.user,
        session_id: payload.session_id,
        guild_ids,
        resume_gateway_url: payload.resume_gateway_url,
    });
}

pub(super) fn on_resumed(ctx: &HandlerContext<'_>) {
    ctx.dispatch(EventKind::Resumed);
}
