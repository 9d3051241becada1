//! Error types for the conversation crate.
//!
//! - `RelayError`: failures of relay operations, lifted into
//!   `rootcause::Report` as they cross the storage boundary
//! - `ParseSenderTypeError` / `ParseContactStatusError`: bad stored enums

use courier_core::{ContactId, ConversationId};
use std::fmt;

/// Errors from relay operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No user with this Telegram id.
    UserNotFound { external_id: String },
    /// No contact with this id or external id.
    ContactNotFound { contact: String },
    /// No conversation with this id.
    ConversationNotFound { id: ConversationId },
    /// A message violates the all-or-none encrypted content rule or is
    /// otherwise unstorable.
    InvalidMessage { reason: String },
    /// The codec refused to encrypt.
    Encryption,
    /// The backing store failed.
    Storage { details: String },
}

impl RelayError {
    /// Creates a `ContactNotFound` for an internal contact id.
    #[must_use]
    pub fn contact_not_found(id: ContactId) -> Self {
        Self::ContactNotFound {
            contact: id.to_string(),
        }
    }

    /// Returns true for the not-found family.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. } | Self::ContactNotFound { .. } | Self::ConversationNotFound { .. }
        )
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { external_id } => write!(f, "user not found: {external_id}"),
            Self::ContactNotFound { contact } => write!(f, "contact not found: {contact}"),
            Self::ConversationNotFound { id } => write!(f, "conversation not found: {id}"),
            Self::InvalidMessage { reason } => write!(f, "invalid message: {reason}"),
            Self::Encryption => write!(f, "message encryption failed"),
            Self::Storage { details } => write!(f, "relay storage failed: {details}"),
        }
    }
}

impl std::error::Error for RelayError {}

/// A stored sender type string was not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSenderTypeError(pub String);

impl fmt::Display for ParseSenderTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sender type: {}", self.0)
    }
}

impl std::error::Error for ParseSenderTypeError {}

/// A stored contact status string was not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContactStatusError(pub String);

impl fmt::Display for ParseContactStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown contact status: {}", self.0)
    }
}

impl std::error::Error for ParseContactStatusError {}
