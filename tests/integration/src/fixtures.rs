//! Test fixtures and frame builders
//!
//! Provides the gateway frames integration tests send to the client.

use chat_client::protocol::{GatewayMessage, HelloPayload};
use serde_json::{json, Value};

/// HELLO with a heartbeat interval long enough to stay out of the way
pub fn hello() -> GatewayMessage {
    GatewayMessage::hello(HelloPayload::with_interval(45_000))
}

/// READY for `session_id`, announcing `guild_ids` as unavailable
pub fn ready(session_id: &str, sequence: u64, resume_url: &str, guild_ids: &[u64]) -> GatewayMessage {
    let guilds: Vec<Value> = guild_ids
        .iter()
        .map(|id| json!({"id": id.to_string(), "unavailable": true}))
        .collect();

    GatewayMessage::dispatch(
        "READY",
        sequence,
        json!({
            "v": 10,
            "user": {"id": "1", "username": "integration-bot", "bot": true},
            "guilds": guilds,
            "session_id": session_id,
            "resume_gateway_url": resume_url
        }),
    )
}

pub fn resumed(sequence: u64) -> GatewayMessage {
    GatewayMessage::dispatch("RESUMED", sequence, json!({}))
}

pub fn guild_create(sequence: u64, guild_id: u64, name: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "GUILD_CREATE",
        sequence,
        json!({
            "id": guild_id.to_string(),
            "name": name,
            "owner_id": "1",
            "member_count": 2,
            "channels": [],
            "members": []
        }),
    )
}

pub fn message_create(sequence: u64, message_id: u64, guild_id: u64, content: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "MESSAGE_CREATE",
        sequence,
        json!({
            "id": message_id.to_string(),
            "channel_id": "10",
            "guild_id": guild_id.to_string(),
            "author": {"id": "2", "username": "alice"},
            "content": content,
            "timestamp": "2024-01-01T00:00:00+00:00"
        }),
    )
}
