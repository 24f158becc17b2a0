use serde::{Deserialize, Serialize};

use super::policy::DenyReason;

/// Account role. Roles only ever move upward: `user -> author -> admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Author,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Author, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Author => "author",
            Role::Admin => "admin",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Author => 1,
            Role::Admin => 2,
        }
    }

    /// Whether this role may publish blogs.
    pub fn can_author(self) -> bool {
        self.rank() >= Role::Author.rank()
    }

    /// Self-service transition `user -> author`.
    pub fn upgrade(self) -> Result<Role, DenyReason> {
        match self {
            Role::User => Ok(Role::Author),
            Role::Author | Role::Admin => Err(DenyReason::AlreadyPrivileged),
        }
    }

    /// Admin-service transition into `admin`. There is no way out of `admin`.
    pub fn promote(self) -> Result<Role, DenyReason> {
        match self {
            Role::User | Role::Author => Ok(Role::Admin),
            Role::Admin => Err(DenyReason::AlreadyPrivileged),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
