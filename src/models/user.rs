// src/models/user.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A role held by a user. Stored as lowercase text in `users.roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Something a caller may be allowed to do beyond acting on their own data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Replace the avatar of any user.
    ManageAnyAvatar,
    /// Read the cross-video comment listing.
    ViewAllComments,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether this role grants `capability`.
    pub fn grants(&self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::User => match capability {
                Capability::ManageAnyAvatar | Capability::ViewAllComments => false,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Parses stored role names, dropping any this build does not know about.
pub fn parse_roles<I, S>(names: I) -> Vec<Role>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| match name.as_ref().parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!("Ignoring stored role: {}", e);
                None
            }
        })
        .collect()
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub roles: Vec<Role>,

    pub avatar_url: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Insert payload for the persistence layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub roles: Vec<Role>,
    pub avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_grants_every_capability() {
        assert!(Role::Admin.grants(Capability::ManageAnyAvatar));
        assert!(Role::Admin.grants(Capability::ViewAllComments));
        assert!(!Role::User.grants(Capability::ManageAnyAvatar));
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let roles = parse_roles(["user", "ADMIN", "moderator"]);
        assert_eq!(roles, vec![Role::User, Role::Admin]);
    }
}
