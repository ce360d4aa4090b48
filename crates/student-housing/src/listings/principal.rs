use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" | "administrator" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated caller as resolved by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub email: String,
}

impl Actor {
    pub fn new(id: UserId, role: Role, email: impl Into<String>) -> Self {
        Self {
            id,
            role,
            email: email.into(),
        }
    }

    pub fn is_owner(&self, owner_id: UserId) -> bool {
        self.id == owner_id
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_moderate(&self) -> bool {
        matches!(self.role, Role::Moderator | Role::Admin)
    }

    /// Owners and administrators may mutate a listing.
    pub fn can_manage(&self, owner_id: UserId) -> bool {
        self.is_owner(owner_id) || self.is_administrator()
    }
}
