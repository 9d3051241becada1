//! HTTP routing.

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::auth::{self, AppState};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Auth routes
        .route("/auth/telegram-webapp", post(auth::telegram_webapp))
        .route("/auth/me", get(auth::me))
        // Admin routes
        .route(
            "/admin/contacts/{contact_external_id}/conversations",
            get(admin::contact_conversations),
        )
        .route(
            "/admin/conversations/{id}/messages",
            get(admin::conversation_messages),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
