//! User entity - an account as seen over the gateway

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// User entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl User {
    /// Get the user's tag (legacy `username#discriminator`, or bare username after migration)
    #[must_use]
    pub fn tag(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Name shown in clients: global display name if set, otherwise username
    #[must_use]
    pub fn effective_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(discriminator: &str) -> User {
        User {
            id: Snowflake::new(1),
            username: "ferris".to_string(),
            discriminator: discriminator.to_string(),
            global_name: None,
            avatar: None,
            bot: false,
        }
    }

    #[test]
    fn test_user_tag() {
        assert_eq!(user("0").tag(), "ferris");
        assert_eq!(user("1234").tag(), "ferris#1234");
    }

    #[test]
    fn test_effective_name() {
        let mut u = user("0");
        assert_eq!(u.effective_name(), "ferris");
        u.global_name = Some("Ferris the Crab".to_string());
        assert_eq!(u.effective_name(), "Ferris the Crab");
    }

    #[test]
    fn test_user_deserialize_minimal() {
        let u: User = serde_json::from_str(r#"{"id":"42","username":"bot"}"#).unwrap();
        assert_eq!(u.id, Snowflake::new(42));
        assert_eq!(u.discriminator, "0");
        assert!(!u.bot);
    }
}
