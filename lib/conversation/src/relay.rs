//! The metadata side of the relay.
//!
//! [`ConversationRelay`] creates conversations, seals and appends messages,
//! and answers routing queries. It can encrypt but never decrypt: it holds
//! a [`Sealer`], not the codec. Plaintext is recovered only through
//! `BotRelay`, which is compiled only with the `bot` feature.
//!
//! ```compile_fail
//! use courier_conversation::{ConversationRelay, Message};
//!
//! fn leak(relay: &ConversationRelay, message: &Message) -> Option<String> {
//!     relay.decrypt_message(message)
//! }
//! ```

use std::sync::Arc;

use courier_core::{ContactId, ConversationId};
use courier_crypto::Sealer;
use rootcause::prelude::Report;

use crate::conversation::{Contact, Conversation};
use crate::error::RelayError;
use crate::message::{Message, SenderType};
use crate::store::RelayStore;

/// Conversation graph and sealed message log.
#[derive(Clone)]
pub struct ConversationRelay {
    store: Arc<dyn RelayStore>,
    sealer: Sealer,
}

impl std::fmt::Debug for ConversationRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRelay")
            .field("sealer", &self.sealer)
            .finish_non_exhaustive()
    }
}

impl ConversationRelay {
    /// Creates a relay over `store`, sealing content with `sealer`.
    #[must_use]
    pub fn new(store: Arc<dyn RelayStore>, sealer: Sealer) -> Self {
        Self { store, sealer }
    }

    /// Returns the conversation between a user and a contact, creating it
    /// on first contact.
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `ContactNotFound` when either participant is
    /// unknown, `Storage` when the store fails.
    pub async fn get_or_create_conversation(
        &self,
        user_external_id: &str,
        contact_id: ContactId,
    ) -> Result<Conversation, Report<RelayError>> {
        let user_id = self
            .store
            .find_user_id(user_external_id)
            .await?
            .ok_or_else(|| RelayError::UserNotFound {
                external_id: user_external_id.to_string(),
            })?;

        if self.store.find_contact(contact_id).await?.is_none() {
            return Err(RelayError::contact_not_found(contact_id).into());
        }

        let conversation = self.store.upsert_conversation(user_id, contact_id).await?;
        tracing::debug!(
            conversation_id = %conversation.id,
            contact_id = %contact_id,
            "conversation resolved"
        );
        Ok(conversation)
    }

    /// Seals `plaintext` and appends it to a conversation.
    ///
    /// The conversation's `last_message_at` advances to the message's
    /// creation time.
    ///
    /// # Errors
    ///
    /// `ConversationNotFound` for an unknown conversation, `Encryption` if
    /// sealing fails, `Storage` when the store fails.
    pub async fn store_message(
        &self,
        conversation_id: ConversationId,
        sender_type: SenderType,
        sender_external_id: &str,
        plaintext: &str,
        external_message_ref: Option<String>,
    ) -> Result<Message, Report<RelayError>> {
        if self.store.find_conversation(conversation_id).await?.is_none() {
            return Err(RelayError::ConversationNotFound {
                id: conversation_id,
            }
            .into());
        }

        let sealed = self.sealer.seal(plaintext).map_err(|e| {
            tracing::error!(error = %e, %conversation_id, "message sealing failed");
            RelayError::Encryption
        })?;

        let message = Message::new(
            conversation_id,
            sender_type,
            sender_external_id,
            Some(sealed),
            external_message_ref,
        );
        self.store.append_message(&message).await?;

        tracing::debug!(
            message_id = %message.id(),
            %conversation_id,
            sender_type = %sender_type,
            "message stored"
        );
        Ok(message)
    }

    /// Finds the conversation between a contact and a user, both given by
    /// Telegram id.
    ///
    /// Unknown participants yield `None`.
    ///
    /// # Errors
    ///
    /// `Storage` when the store fails.
    pub async fn find_conversation_by_participants(
        &self,
        contact_external_id: &str,
        user_external_id: &str,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        let Some(contact) = self
            .store
            .find_contact_by_external_id(contact_external_id)
            .await?
        else {
            return Ok(None);
        };
        let Some(user_id) = self.store.find_user_id(user_external_id).await? else {
            return Ok(None);
        };
        self.store.find_conversation_by_pair(user_id, contact.id).await
    }

    /// Active conversations of a contact, most recent activity first.
    ///
    /// # Errors
    ///
    /// `ContactNotFound` for an unknown contact, `Storage` when the store
    /// fails.
    pub async fn find_active_conversations_for_contact(
        &self,
        contact_external_id: &str,
    ) -> Result<Vec<Conversation>, Report<RelayError>> {
        let contact = self.contact_by_external_id(contact_external_id).await?;
        self.store.active_conversations_for_contact(contact.id).await
    }

    /// Looks a conversation up by id.
    ///
    /// # Errors
    ///
    /// `ConversationNotFound` for an unknown id, `Storage` when the store
    /// fails.
    pub async fn conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, Report<RelayError>> {
        self.store
            .find_conversation(id)
            .await?
            .ok_or_else(|| RelayError::ConversationNotFound { id }.into())
    }

    /// Messages of a conversation ordered by `(created_at, id)`.
    ///
    /// # Errors
    ///
    /// `ConversationNotFound` for an unknown id, `Storage` when the store
    /// fails.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<RelayError>> {
        self.conversation(conversation_id).await?;
        self.store.list_messages(conversation_id).await
    }

    /// Resolves a contact by Telegram id.
    ///
    /// # Errors
    ///
    /// `ContactNotFound` for an unknown contact.
    pub async fn contact_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Contact, Report<RelayError>> {
        self.store
            .find_contact_by_external_id(external_id)
            .await?
            .ok_or_else(|| {
                RelayError::ContactNotFound {
                    contact: external_id.to_string(),
                }
                .into()
            })
    }
}
