//! Stage instance entity - a live stage held in a stage channel

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Privacy level of a stage instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "u8", into = "u8")]
pub enum StagePrivacyLevel {
    /// Visible publicly (deprecated by the remote)
    Public,
    /// Visible to guild members only
    #[default]
    GuildOnly,
}

impl From<u8> for StagePrivacyLevel {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Public,
            _ => Self::GuildOnly,
        }
    }
}

impl From<StagePrivacyLevel> for u8 {
    fn from(level: StagePrivacyLevel) -> Self {
        match level {
            StagePrivacyLevel::Public => 1,
            StagePrivacyLevel::GuildOnly => 2,
        }
    }
}

/// Stage instance entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInstance {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
    pub topic: String,
    #[serde(default)]
    pub privacy_level: StagePrivacyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_scheduled_event_id: Option<Snowflake>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_instance_deserialize() {
        let json = r#"{
            "id": "840647391636226060",
            "guild_id": "197038439483310086",
            "channel_id": "733488538393510049",
            "topic": "Testing Testing, 123",
            "privacy_level": 1,
            "guild_scheduled_event_id": "947656305244532806"
        }"#;
        let stage: StageInstance = serde_json::from_str(json).unwrap();
        assert_eq!(stage.privacy_level, StagePrivacyLevel::Public);
        assert_eq!(stage.guild_id, Snowflake::new(197_038_439_483_310_086));
        assert!(stage.guild_scheduled_event_id.is_some());
    }

    #[test]
    fn test_privacy_level_serializes_as_number() {
        assert_eq!(serde_json::to_string(&StagePrivacyLevel::GuildOnly).unwrap(), "2");
    }
}
