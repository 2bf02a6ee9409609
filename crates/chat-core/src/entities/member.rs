//! Member entity - represents a user's membership in a guild

use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Guild member entity
///
/// `guild_id` is absent when the member is nested inside a guild payload and
/// present on standalone member events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, rename = "nick", skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, rename = "roles")]
    pub role_ids: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

impl Member {
    /// Get display name (nickname if set, otherwise the user's name)
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .unwrap_or_else(|| self.user.effective_name())
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }
}
