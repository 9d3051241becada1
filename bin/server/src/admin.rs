//! Admin routes exposing relay metadata.
//!
//! These handlers only see a `ConversationRelay`. Responses carry ids,
//! sender information, timestamps and an `encrypted` flag; message content
//! in any form stays in storage.

use axum::{
    Json,
    extract::{Path, State},
};
use courier_conversation::{Conversation, MessageSummary};
use courier_core::ConversationId;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AppState, RequireAdmin};
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ConversationList {
    conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    messages: Vec<MessageSummary>,
}

/// Lists a contact's active conversations, most recent activity first.
pub async fn contact_conversations(
    State(state): State<Arc<AppState>>,
    RequireAdmin(claims): RequireAdmin,
    Path(contact_external_id): Path<String>,
) -> Result<Json<ConversationList>, ApiError> {
    let conversations = state
        .relay
        .find_active_conversations_for_contact(&contact_external_id)
        .await?;

    tracing::debug!(
        admin_id = %claims.sub,
        contact = %contact_external_id,
        count = conversations.len(),
        "listed contact conversations"
    );
    Ok(Json(ConversationList { conversations }))
}

/// Lists message metadata for a conversation in `(created_at, id)` order.
pub async fn conversation_messages(
    State(state): State<Arc<AppState>>,
    RequireAdmin(claims): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageList>, ApiError> {
    let id: ConversationId = id.parse().map_err(|_| ApiError::Validation)?;
    let messages = state.relay.list_messages(id).await?;

    tracing::debug!(
        admin_id = %claims.sub,
        conversation_id = %id,
        count = messages.len(),
        "listed conversation messages"
    );
    Ok(Json(MessageList {
        messages: messages.iter().map(|m| m.summary()).collect(),
    }))
}
