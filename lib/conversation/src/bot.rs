//! The bot-facing side of the relay.
//!
//! [`BotRelay`] is the only type in the workspace that turns a stored
//! [`Message`] back into text. It is built by the bot integration, never
//! by the HTTP server.

use std::sync::Arc;

use courier_core::{ContactId, ConversationId};
use courier_crypto::{CodecError, EncryptionCodec};
use rootcause::prelude::Report;

use crate::conversation::Conversation;
use crate::error::RelayError;
use crate::message::{Message, SenderType};
use crate::relay::ConversationRelay;
use crate::store::RelayStore;

/// What reading a stored message produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readable {
    /// The decrypted text.
    Plain(String),
    /// The content failed authentication or is malformed. Retrying cannot
    /// help.
    Unreadable,
    /// The message has no stored content.
    Empty,
}

/// Relay with decryption rights, for the bot integration.
#[derive(Clone)]
pub struct BotRelay {
    relay: ConversationRelay,
    codec: Arc<EncryptionCodec>,
}

impl std::fmt::Debug for BotRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRelay")
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl BotRelay {
    /// Creates a bot relay. The inner [`ConversationRelay`] seals with the
    /// same key the codec opens with.
    #[must_use]
    pub fn new(store: Arc<dyn RelayStore>, codec: Arc<EncryptionCodec>) -> Self {
        Self {
            relay: ConversationRelay::new(store, codec.sealer()),
            codec,
        }
    }

    /// Returns the metadata relay.
    #[must_use]
    pub fn relay(&self) -> &ConversationRelay {
        &self.relay
    }

    /// See [`ConversationRelay::get_or_create_conversation`].
    ///
    /// # Errors
    ///
    /// As the delegated operation.
    pub async fn get_or_create_conversation(
        &self,
        user_external_id: &str,
        contact_id: ContactId,
    ) -> Result<Conversation, Report<RelayError>> {
        self.relay
            .get_or_create_conversation(user_external_id, contact_id)
            .await
    }

    /// See [`ConversationRelay::store_message`].
    ///
    /// # Errors
    ///
    /// As the delegated operation.
    pub async fn store_message(
        &self,
        conversation_id: ConversationId,
        sender_type: SenderType,
        sender_external_id: &str,
        plaintext: &str,
        external_message_ref: Option<String>,
    ) -> Result<Message, Report<RelayError>> {
        self.relay
            .store_message(
                conversation_id,
                sender_type,
                sender_external_id,
                plaintext,
                external_message_ref,
            )
            .await
    }

    /// See [`ConversationRelay::find_conversation_by_participants`].
    ///
    /// # Errors
    ///
    /// As the delegated operation.
    pub async fn find_conversation_by_participants(
        &self,
        contact_external_id: &str,
        user_external_id: &str,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        self.relay
            .find_conversation_by_participants(contact_external_id, user_external_id)
            .await
    }

    /// See [`ConversationRelay::find_active_conversations_for_contact`].
    ///
    /// # Errors
    ///
    /// As the delegated operation.
    pub async fn find_active_conversations_for_contact(
        &self,
        contact_external_id: &str,
    ) -> Result<Vec<Conversation>, Report<RelayError>> {
        self.relay
            .find_active_conversations_for_contact(contact_external_id)
            .await
    }

    /// Decrypts a stored message, failing closed.
    ///
    /// `None` for messages without content and for any integrity failure.
    #[must_use]
    pub fn decrypt_message(&self, message: &Message) -> Option<String> {
        match self.read_message(message) {
            Readable::Plain(text) => Some(text),
            Readable::Unreadable | Readable::Empty => None,
        }
    }

    /// Reads a stored message, telling integrity failures apart from
    /// messages that never had content.
    #[must_use]
    pub fn read_message(&self, message: &Message) -> Readable {
        let Some(content) = message.content() else {
            return Readable::Empty;
        };

        match self
            .codec
            .open(&content.ciphertext, &content.iv, &content.auth_tag)
        {
            Ok(text) => Readable::Plain(text),
            Err(e) => {
                let reason = match e {
                    CodecError::Integrity => "integrity",
                    CodecError::Malformed { .. } => "malformed",
                    _ => "undecodable",
                };
                tracing::warn!(
                    message_id = %message.id(),
                    conversation_id = %message.conversation_id(),
                    reason,
                    "stored message is unreadable"
                );
                Readable::Unreadable
            }
        }
    }
}
