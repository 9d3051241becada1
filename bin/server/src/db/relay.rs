//! Postgres-backed relay store.
//!
//! Conversation creation relies on the `(user_id, contact_id)` unique
//! constraint: the insert either creates the row or, on conflict, returns
//! the existing one. Concurrent first contacts never produce two rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_conversation::{Contact, Conversation, Message, RelayError, RelayStore};
use courier_core::{ContactId, ConversationId, MessageId, UserId};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str =
    "id, user_id, contact_id, is_active, last_message_at, created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_type, sender_external_id, \
                               ciphertext, iv, auth_tag, external_message_ref, created_at";

/// Row type for contact queries.
#[derive(FromRow)]
struct ContactRow {
    id: Uuid,
    telegram_id: String,
    display_name: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl ContactRow {
    fn try_into_contact(self) -> Result<Contact, RelayError> {
        let status = self.status.parse().map_err(|e| corrupt("contact", self.id, e))?;
        Ok(Contact {
            id: ContactId::from_uuid(self.id),
            external_id: self.telegram_id,
            display_name: self.display_name,
            status,
            created_at: self.created_at,
        })
    }
}

/// Row type for conversation queries.
#[derive(FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: Uuid,
    contact_id: Uuid,
    is_active: bool,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: ConversationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            contact_id: ContactId::from_uuid(row.contact_id),
            is_active: row.is_active,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

/// Row type for message queries.
#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_type: String,
    sender_external_id: String,
    ciphertext: Option<String>,
    iv: Option<String>,
    auth_tag: Option<String>,
    external_message_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_message(self) -> Result<Message, RelayError> {
        let sender_type = self
            .sender_type
            .parse()
            .map_err(|e| corrupt("message", self.id, e))?;
        Message::from_parts(
            MessageId::from_uuid(self.id),
            ConversationId::from_uuid(self.conversation_id),
            sender_type,
            self.sender_external_id,
            self.ciphertext,
            self.iv,
            self.auth_tag,
            self.external_message_ref,
            self.created_at,
        )
    }
}

fn corrupt(kind: &str, id: Uuid, e: impl std::fmt::Display) -> RelayError {
    RelayError::Storage {
        details: format!("corrupt {kind} row {id}: {e}"),
    }
}

fn storage(e: sqlx::Error) -> RelayError {
    RelayError::Storage {
        details: e.to_string(),
    }
}

/// Repository for contacts, conversations and messages.
#[derive(Clone)]
pub struct PgRelayStore {
    pool: PgPool,
}

impl PgRelayStore {
    /// Creates a new relay repository.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelayStore for PgRelayStore {
    async fn find_user_id(&self, external_id: &str) -> Result<Option<UserId>, Report<RelayError>> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE telegram_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(id.map(UserId::from_uuid))
    }

    async fn find_contact(&self, id: ContactId) -> Result<Option<Contact>, Report<RelayError>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, telegram_id, display_name, status, created_at FROM contacts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(r) => Ok(Some(r.try_into_contact()?)),
            None => Ok(None),
        }
    }

    async fn find_contact_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Contact>, Report<RelayError>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, telegram_id, display_name, status, created_at \
             FROM contacts WHERE telegram_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        match row {
            Some(r) => Ok(Some(r.try_into_contact()?)),
            None => Ok(None),
        }
    }

    async fn upsert_conversation(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Conversation, Report<RelayError>> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: ConversationRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO conversations (id, user_id, contact_id, is_active, created_at)
            VALUES ($1, $2, $3, TRUE, now())
            ON CONFLICT ON CONSTRAINT conversations_participants_key
            DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(ConversationId::new().as_uuid())
        .bind(user_id.as_uuid())
        .bind(contact_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.into())
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(Into::into))
    }

    async fn find_conversation_by_pair(
        &self,
        user_id: UserId,
        contact_id: ContactId,
    ) -> Result<Option<Conversation>, Report<RelayError>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE user_id = $1 AND contact_id = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(contact_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(Into::into))
    }

    async fn active_conversations_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<Conversation>, Report<RelayError>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE contact_id = $1 AND is_active \
             ORDER BY last_message_at DESC NULLS LAST, id DESC"
        ))
        .bind(contact_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn append_message(&self, message: &Message) -> Result<(), Report<RelayError>> {
        let id = message.conversation_id();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let touched = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(message.created_at())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if touched.rows_affected() == 0 {
            return Err(RelayError::ConversationNotFound { id }.into());
        }

        let content = message.content();
        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(message.id().as_uuid())
        .bind(id.as_uuid())
        .bind(message.sender_type().as_str())
        .bind(message.sender_external_id())
        .bind(content.map(|c| c.ciphertext.as_str()))
        .bind(content.map(|c| c.iv.as_str()))
        .bind(content.map(|c| c.auth_tag.as_str()))
        .bind(message.external_message_ref())
        .bind(message.created_at())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, Report<RelayError>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 ORDER BY created_at, id"
        ))
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter()
            .map(|r| r.try_into_message().map_err(Report::from))
            .collect()
    }
}
