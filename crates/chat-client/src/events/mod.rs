//! Gateway events
//!
//! Dispatch event names, their payloads, and the events handed to listeners.

mod event;
mod event_types;
mod payloads;

pub use event::{Event, EventKind, GenericEvent};
pub use event_types::GatewayEventType;
pub use payloads::{
    GuildDeletePayload, GuildMemberPayload, GuildMemberRemovePayload, GuildMembersChunkPayload,
    MessageDeletePayload, ReadyPayload, ScheduledEventUserPayload, TypingStartPayload,
};
