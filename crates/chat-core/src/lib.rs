//! # chat-core
//!
//! Entities and value objects received over the gateway.
//! This crate has zero dependencies on infrastructure (transport, cache, runtime).

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Channel, ChannelType, Guild, Member, Message, StageInstance, StagePrivacyLevel,
    UnavailableGuild, User,
};
pub use value_objects::{Snowflake, SnowflakeParseError};
