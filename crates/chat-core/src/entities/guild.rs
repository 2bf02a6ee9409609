//! Guild entity - a server the current user belongs to

use serde::{Deserialize, Serialize};

use super::{Channel, Member};
use crate::value_objects::Snowflake;

/// Guild entity
///
/// `channels` and `members` are only populated on the initial guild payload;
/// the cache stores them separately and keeps this struct lean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub large: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
}

impl Guild {
    /// Check if a user owns this guild
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == user_id
    }

    /// Split the nested channel and member lists off the guild
    ///
    /// Channels and members come back with their `guild_id` filled in, since the
    /// remote omits it inside a guild payload.
    #[must_use]
    pub fn take_children(&mut self) -> (Vec<Channel>, Vec<Member>) {
        let id = self.id;
        let channels = std::mem::take(&mut self.channels)
            .into_iter()
            .map(|mut c| {
                c.guild_id.get_or_insert(id);
                c
            })
            .collect();
        let members = std::mem::take(&mut self.members)
            .into_iter()
            .map(|mut m| {
                m.guild_id.get_or_insert(id);
                m
            })
            .collect();
        (channels, members)
    }
}

/// Guild that is not (yet) available to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_deserialize_with_children() {
        let json = serde_json::json!({
            "id": "10",
            "name": "rust",
            "owner_id": "1",
            "channels": [{"id": "11", "type": 0, "name": "general"}],
            "members": [{"user": {"id": "1", "username": "owner"}, "roles": []}]
        });

        let mut guild: Guild = serde_json::from_value(json).unwrap();
        assert!(guild.is_owner(Snowflake::new(1)));

        let (channels, members) = guild.take_children();
        assert!(guild.channels.is_empty());
        assert_eq!(channels[0].guild_id, Some(Snowflake::new(10)));
        assert_eq!(members[0].guild_id, Some(Snowflake::new(10)));
    }

    #[test]
    fn test_unavailable_guild() {
        let g: UnavailableGuild =
            serde_json::from_str(r#"{"id":"5","unavailable":true}"#).unwrap();
        assert_eq!(g.id, Snowflake::new(5));
        assert!(g.unavailable);
    }
}
