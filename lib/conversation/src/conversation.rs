//! Contacts and conversations.

use chrono::{DateTime, Utc};
use courier_core::{ContactId, ConversationId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseContactStatusError;

/// Whether a contact can currently receive relayed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    Reachable,
    Unreachable,
}

impl ContactStatus {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reachable => "REACHABLE",
            Self::Unreachable => "UNREACHABLE",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = ParseContactStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REACHABLE" => Ok(Self::Reachable),
            "UNREACHABLE" => Ok(Self::Unreachable),
            other => Err(ParseContactStatusError(other.to_string())),
        }
    }
}

/// An external responder, keyed by a unique Telegram id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    /// Telegram id, unique across contacts.
    pub external_id: String,
    pub display_name: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a reachable contact.
    #[must_use]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            id: ContactId::new(),
            external_id: external_id.into(),
            display_name: None,
            status: ContactStatus::Reachable,
            created_at: Utc::now(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: ContactStatus) -> Self {
        self.status = status;
        self
    }
}

/// The relay channel between one user and one contact.
///
/// Unique on `(user_id, contact_id)`. Conversations are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub contact_id: ContactId,
    pub is_active: bool,
    /// When the last message was stored, if any.
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an active conversation with no messages.
    #[must_use]
    pub fn new(user_id: UserId, contact_id: ContactId) -> Self {
        Self {
            id: ConversationId::new(),
            user_id,
            contact_id,
            is_active: true,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    /// Records that a message was stored at `at`.
    ///
    /// `last_message_at` never moves backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if self.last_message_at.is_none_or(|last| at > last) {
            self.last_message_at = Some(at);
        }
    }
}

/// Routing order: most recent `last_message_at` first, conversations
/// without messages last, ties broken by id.
pub fn by_recent_activity(a: &Conversation, b: &Conversation) -> Ordering {
    match (a.last_message_at, b.last_message_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.id.cmp(&a.id))
}
