//! Message types for relayed conversations.
//!
//! A [`Message`] never holds plaintext. Its content is either a complete
//! encrypted payload or nothing; a partial payload cannot be constructed.
//! `Message` deliberately has no `Serialize` impl: the only serializable
//! view is [`MessageSummary`], which carries metadata and an `encrypted`
//! flag.

use chrono::{DateTime, Utc};
use courier_core::{ConversationId, MessageId};
use courier_crypto::EncryptedPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParseSenderTypeError, RelayError};

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderType {
    /// The application user.
    Student,
    /// The external contact.
    Contact,
}

impl SenderType {
    /// Returns the stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Contact => "CONTACT",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = ParseSenderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Self::Student),
            "CONTACT" => Ok(Self::Contact),
            other => Err(ParseSenderTypeError(other.to_string())),
        }
    }
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    sender_type: SenderType,
    sender_external_id: String,
    content: Option<EncryptedPayload>,
    external_message_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message stamped with the current time.
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        sender_type: SenderType,
        sender_external_id: impl Into<String>,
        content: Option<EncryptedPayload>,
        external_message_ref: Option<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            sender_type,
            sender_external_id: sender_external_id.into(),
            content,
            external_message_ref,
            created_at: Utc::now(),
        }
    }

    /// Reconstitutes a message from separately stored columns.
    ///
    /// # Errors
    ///
    /// `InvalidMessage` unless `ciphertext`, `iv` and `auth_tag` are all
    /// present or all absent.
    #[expect(clippy::too_many_arguments)]
    pub fn from_parts(
        id: MessageId,
        conversation_id: ConversationId,
        sender_type: SenderType,
        sender_external_id: String,
        ciphertext: Option<String>,
        iv: Option<String>,
        auth_tag: Option<String>,
        external_message_ref: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, RelayError> {
        let content = match (ciphertext, iv, auth_tag) {
            (Some(ciphertext), Some(iv), Some(auth_tag)) => Some(EncryptedPayload {
                ciphertext,
                iv,
                auth_tag,
            }),
            (None, None, None) => None,
            _ => {
                return Err(RelayError::InvalidMessage {
                    reason: "partial encrypted content".to_string(),
                });
            }
        };

        Ok(Self {
            id,
            conversation_id,
            sender_type,
            sender_external_id,
            content,
            external_message_ref,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    #[must_use]
    pub fn sender_type(&self) -> SenderType {
        self.sender_type
    }

    #[must_use]
    pub fn sender_external_id(&self) -> &str {
        &self.sender_external_id
    }

    /// Returns the encrypted content, if any was stored.
    #[must_use]
    pub fn content(&self) -> Option<&EncryptedPayload> {
        self.content.as_ref()
    }

    /// Returns true if the message carries encrypted content.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.content.is_some()
    }

    /// Returns the Telegram message id this message was relayed as.
    #[must_use]
    pub fn external_message_ref(&self) -> Option<&str> {
        self.external_message_ref.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the metadata-only view of this message.
    #[must_use]
    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_type: self.sender_type,
            sender_external_id: self.sender_external_id.clone(),
            external_message_ref: self.external_message_ref.clone(),
            encrypted: self.is_encrypted(),
            created_at: self.created_at,
        }
    }
}

/// Metadata view of a message, safe to return from any API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_type: SenderType,
    pub sender_external_id: String,
    pub external_message_ref: Option<String>,
    /// Whether encrypted content is stored for this message.
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(
        ciphertext: Option<&str>,
        iv: Option<&str>,
        auth_tag: Option<&str>,
    ) -> Result<Message, RelayError> {
        Message::from_parts(
            MessageId::new(),
            ConversationId::new(),
            SenderType::Contact,
            "77".to_string(),
            ciphertext.map(str::to_string),
            iv.map(str::to_string),
            auth_tag.map(str::to_string),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn complete_or_empty_content_is_accepted() {
        let full = parts(Some("aa"), Some("bb"), Some("cc")).expect("complete");
        assert!(full.is_encrypted());
        assert_eq!(full.content().map(|c| c.iv.as_str()), Some("bb"));

        let empty = parts(None, None, None).expect("empty");
        assert!(!empty.is_encrypted());
    }

    #[test]
    fn partial_content_is_rejected() {
        let cases = [
            (Some("aa"), None, None),
            (None, Some("bb"), None),
            (None, None, Some("cc")),
            (Some("aa"), Some("bb"), None),
            (Some("aa"), None, Some("cc")),
            (None, Some("bb"), Some("cc")),
        ];
        for (ciphertext, iv, auth_tag) in cases {
            let err = parts(ciphertext, iv, auth_tag).expect_err("partial");
            assert!(matches!(err, RelayError::InvalidMessage { .. }));
        }
    }

    #[test]
    fn sender_type_string_forms() {
        assert_eq!(SenderType::Student.to_string(), "STUDENT");
        assert_eq!("CONTACT".parse::<SenderType>(), Ok(SenderType::Contact));
        assert!("contact".parse::<SenderType>().is_err());
    }

    #[test]
    fn summary_has_no_content_fields() {
        let message = Message::new(
            ConversationId::new(),
            SenderType::Student,
            "1001",
            Some(EncryptedPayload {
                ciphertext: "deadbeef".to_string(),
                iv: "00".repeat(12),
                auth_tag: "11".repeat(16),
            }),
            Some("4242".to_string()),
        );

        let json = serde_json::to_value(message.summary()).expect("serialize");
        let object = json.as_object().expect("object");
        assert_eq!(object["encrypted"], serde_json::json!(true));
        assert_eq!(object["senderType"], serde_json::json!("STUDENT"));
        assert_eq!(object["externalMessageRef"], serde_json::json!("4242"));
        for field in ["ciphertext", "iv", "authTag", "content", "plaintext"] {
            assert!(!object.contains_key(field), "{field} leaked");
        }
        assert!(!json.to_string().contains("deadbeef"));
    }
}
