//! Strongly-typed ID types for domain entities.
//!
//! All IDs are UUIDv7 values. Version 7 embeds a millisecond timestamp and a
//! per-process counter, so ids created later compare greater. Message
//! listings rely on this as the tie-break after `created_at`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around a UUID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for an application user (the session subject).
    UserId
);

define_id!(
    /// Unique identifier for an external contact.
    ContactId
);

define_id!(
    /// Unique identifier for a user/contact conversation.
    ConversationId
);

define_id!(
    /// Unique identifier for a relayed message.
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_plain_uuid() {
        let id = UserId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn display_parses_back() {
        let id = ConversationId::new();
        let parsed: ConversationId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn prefixed_form_is_rejected() {
        let id = ConversationId::new();
        assert!(format!("conv_{id}").parse::<ConversationId>().is_err());
    }

    #[test]
    fn parse_plain_uuid() {
        let uuid = Uuid::now_v7();
        let id: MessageId = uuid.to_string().parse().expect("should parse");
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn parse_invalid_uuid() {
        let err = "not-a-uuid"
            .parse::<ContactId>()
            .expect_err("should not parse");
        assert_eq!(err.id_type, "ContactId");
    }

    #[test]
    fn ids_are_time_ordered() {
        let first = MessageId::new();
        let second = MessageId::new();
        assert!(second > first);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: UserId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
