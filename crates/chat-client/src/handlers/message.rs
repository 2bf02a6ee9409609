//! Message handlers
//!
//! Messages are scoped by channel. The message cache is off by default, in
//! which case update and delete events carry no previous value.

use super::HandlerContext;
use crate::events::{EventKind, MessageDeletePayload};
use chat_cache::CacheStore;
use chat_core::Message;

pub(super) fn on_message_create(ctx: &HandlerContext<'_>, message: Message) {
    ctx.caches()
        .messages()
        .put(message.channel_id, message.id, message.clone());
    ctx.dispatch(EventKind::MessageCreate(message));
}

pub(super) fn on_message_update(ctx: &HandlerContext<'_>, message: Message) {
    let old = ctx
        .caches()
        .messages()
        .put(message.channel_id, message.id, message.clone());
    ctx.dispatch(EventKind::MessageUpdate { message, old });
}

pub(super) fn on_message_delete(ctx: &HandlerContext<'_>, payload: MessageDeletePayload) {
    let message = ctx
        .caches()
        .messages()
        .remove(payload.channel_id, payload.id);
    ctx.dispatch(EventKind::MessageDelete {
        message_id: payload.id,
        channel_id: payload.channel_id,
        guild_id: payload.guild_id,
        message,
    });
}

#[cfg(test)]
mod tests {
    use crate::events::{EventKind, GatewayEventType};
    use crate::handlers::testing::Harness;
    use serde_json::{json, Value};

    fn message_json(content: &str) -> Value {
        json!({
            "id": "1",
            "channel_id": "10",
            "guild_id": "100",
            "author": {"id": "2", "username": "alice"},
            "content": content,
            "timestamp": "2024-01-01T00:00:00+00:00"
        })
    }

    #[test]
    fn test_message_lifecycle() {
        let harness = Harness::new();
        harness.feed(GatewayEventType::MessageCreate, 2, message_json("hello"));
        harness.feed(GatewayEventType::MessageUpdate, 3, message_json("hello!"));
        harness.feed(
            GatewayEventType::MessageDelete,
            4,
            json!({"id": "1", "channel_id": "10", "guild_id": "100"}),
        );

        let events = harness.take();
        assert_eq!(events.len(), 3);

        match &events[1].kind {
            EventKind::MessageUpdate { message, old } => {
                assert_eq!(message.content, "hello!");
                assert_eq!(old.as_ref().map(|m| m.content.as_str()), Some("hello"));
            }
            other => panic!("unexpected event {}", other.name()),
        }
        match &events[2].kind {
            EventKind::MessageDelete { message, .. } => {
                assert_eq!(message.as_ref().map(|m| m.content.as_str()), Some("hello!"));
            }
            other => panic!("unexpected event {}", other.name()),
        }
        assert!(harness.client.caches().messages().is_empty());
    }

    #[test]
    fn test_sequences_follow_frames() {
        let harness = Harness::new();
        harness.feed(GatewayEventType::MessageCreate, 7, message_json("a"));
        harness.feed(GatewayEventType::MessageCreate, 8, message_json("b"));

        let sequences: Vec<u64> = harness.take().iter().map(|e| e.sequence()).collect();
        assert_eq!(sequences, vec![7, 8]);
    }
}
