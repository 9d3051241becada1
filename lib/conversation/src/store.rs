//! Relay persistence.
//!
//! [`RelayStore`] is the storage seam for the conversation graph and the
//! message log. Implementations must make [`RelayStore::upsert_conversation`]
//! atomic: concurrent callers for the same `(user, contact)` pair all
//! observe the same single row.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use courier_core::{ContactId, ConversationId, UserId};
use rootcause::prelude::Report;

use crate::conversation::{Contact, Conversation, by_recent_activity};
use crate::error::RelayError;
use crate::message::Message;

/// Persistent storage for contacts, conversations and messages.
#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Resolves a user's internal id from their Telegram id.
    async fn find_user_id(&self, external_id: &str) -> Result<Option<UserId>, Report<RelayError>>;

    /// Looks a contact up by internal id.
    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, Report<RelayError>>;

    /// Looks a contact up by Telegram id.
    async fn find_contact_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Contact>, Report<RelayError>>;

    /// Returns the conversation for the pair, inserting it if absent.
    async fn upsert_conversation(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Conversation, Report<RelayError>>;

    /// Looks a conversation up by id.
    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, Report<RelayError>>;

    /// Looks a conversation up by its participants.
    async fn find_conversation_by_pair(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Option<Conversation>, Report<RelayError>>;

    /// Active conversations of a contact, most recent activity first.
    async fn active_conversations_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Conversation>, Report<RelayError>>;

    /// Appends `message` and advances the conversation's
    /// `last_message_at` in one step.
    async fn append_message(&self, message: &Message) -> Result<(), Report<RelayError>>;

    /// Messages of a conversation ordered by `(created_at, id)`.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<RelayError>>;
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, UserId>,
    contacts: HashMap<ContactId, Contact>,
    conversations: HashMap<ConversationId, Conversation>,
    pairs: HashMap<(UserId, ContactId), ConversationId>,
    messages: Vec<Message>,
}

/// In-memory relay store.
///
/// All state sits behind one mutex, so the pair uniqueness check and the
/// insert happen as one step.
#[derive(Debug, Default)]
pub struct MemoryRelayStore {
    state: Mutex<State>,
}

impl MemoryRelayStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so relay lookups by Telegram id resolve.
    pub fn register_user(
        &self,
        external_id: impl Into<String>,
        id: UserId,
    ) -> Result<(), Report<RelayError>> {
        self.lock()?.users.insert(external_id.into(), id);
        Ok(())
    }

    /// Inserts or replaces a contact.
    pub fn insert_contact(&self, contact: Contact) -> Result<(), Report<RelayError>> {
        self.lock()?.contacts.insert(contact.id, contact);
        Ok(())
    }

    /// Marks a conversation active or inactive.
    pub fn set_active(&self, id: ConversationId, active: bool) -> Result<(), Report<RelayError>> {
        let mut state = self.lock()?;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(RelayError::ConversationNotFound { id })?;
        conversation.is_active = active;
        Ok(())
    }

    /// Number of stored conversations.
    pub fn conversation_count(&self) -> Result<usize, Report<RelayError>> {
        Ok(self.lock()?.conversations.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, Report<RelayError>> {
        self.state.lock().map_err(|_| {
            RelayError::Storage {
                details: "relay state lock poisoned".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl RelayStore for MemoryRelayStore {
    async fn find_user_id(&self, external_id: &str) -> Result<Option<UserId>, Report<RelayError>> {
        Ok(self.lock()?.users.get(external_id).copied())
    }

    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, Report<RelayError>> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    async fn find_contact_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Contact>, Report<RelayError>> {
        Ok(self
            .lock()?
            .contacts
            .values()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn upsert_conversation(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Conversation, Report<RelayError>> {
        let mut state = self.lock()?;
        if let Some(id) = state.pairs.get(&(user_id, contact_id)).copied() {
            return state
                .conversations
                .get(&id)
                .cloned()
                .ok_or_else(|| RelayError::ConversationNotFound { id }.into());
        }

        let conversation = Conversation::new(user_id, contact_id);
        state.pairs.insert((user_id, contact_id), conversation.id);
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        Ok(self.lock()?.conversations.get(&id).cloned())
    }

    async fn find_conversation_by_pair(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        let state = self.lock()?;
        Ok(state
            .pairs
            .get(&(user_id, contact_id))
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn active_conversations_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Conversation>, Report<RelayError>> {
        let mut conversations: Vec<Conversation> = self
            .lock()?
            .conversations
            .values()
            .filter(|c| c.contact_id == contact_id && c.is_active)
            .cloned()
            .collect();
        conversations.sort_by(by_recent_activity);
        Ok(conversations)
    }

    async fn append_message(&self, message: &Message) -> Result<(), Report<RelayError>> {
        let mut state = self.lock()?;
        let id = message.conversation_id();
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(RelayError::ConversationNotFound { id })?;
        conversation.touch(message.created_at());
        state.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<RelayError>> {
        let mut messages: Vec<Message> = self
            .lock()?
            .messages
            .iter()
            .filter(|m| m.conversation_id() == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SenderType;

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = MemoryRelayStore::new();
        let user = UserId::new();
        let contact = ContactId::new();

        let first = store.upsert_conversation(user, contact).await.expect("first");
        let second = store.upsert_conversation(user, contact).await.expect("second");

        assert_eq!(first.id, second.id);
        assert_eq!(store.conversation_count().expect("count"), 1);
    }

    #[tokio::test]
    async fn append_requires_conversation() {
        let store = MemoryRelayStore::new();
        let message = Message::new(ConversationId::new(), SenderType::Student, "1", None, None);
        let err = store.append_message(&message).await.expect_err("missing");
        assert!(matches!(
            err.current_context(),
            RelayError::ConversationNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn inactive_conversations_are_not_routed() {
        let store = MemoryRelayStore::new();
        let contact = ContactId::new();
        let active = store
            .upsert_conversation(UserId::new(), contact)
            .await
            .expect("active");
        let inactive = store
            .upsert_conversation(UserId::new(), contact)
            .await
            .expect("inactive");
        store.set_active(inactive.id, false).expect("deactivate");

        let routed = store
            .active_conversations_for_contact(contact)
            .await
            .expect("query");
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].id, active.id);
    }
}
