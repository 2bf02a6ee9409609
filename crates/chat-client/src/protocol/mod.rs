//! Gateway protocol definitions
//!
//! Op codes, frame format, control payloads, intents and close codes.

mod close_codes;
mod intents;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseAction, CloseCode, CloseCodeTable, NORMAL_CLOSURE, RESUMABLE_CLOSURE};
pub use intents::Intents;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload,
};
