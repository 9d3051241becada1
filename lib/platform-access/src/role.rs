//! Role types for platform access control.
//!
//! Every user holds exactly one role. `Admin` is granted and revoked only by
//! the server-side allow-list (see [`crate::reconcile`]); nothing a client
//! sends can change it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform access role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A regular Mini-App user.
    Student,
    /// An external responder reached through the bot.
    ContactPerson,
    /// Administrator with access to the admin API.
    Admin,
}

impl Role {
    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Returns the canonical string form used in tokens and storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::ContactPerson => "CONTACT_PERSON",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Self::Student),
            "CONTACT_PERSON" => Ok(Self::ContactPerson),
            "ADMIN" => Ok(Self::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
