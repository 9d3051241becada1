//! Authentication routes for Telegram WebApp login and the current user.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use courier_platform_access::{LoginError, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{AppState, ClientIp, RequireAuth};
use crate::error::ApiError;

/// Body of `POST /auth/telegram-webapp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    init_data: String,
}

/// A successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_at: DateTime<Utc>,
    is_new_user: bool,
    user: User,
}

/// The caller's profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    user: User,
    expires_at: Option<DateTime<Utc>>,
}

/// Exchanges Telegram WebApp launch data for a bearer token.
pub async fn telegram_webapp(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!(client_ip = %client_ip, error = %e, "login body rejected");
        ApiError::Validation
    })?;

    if request.init_data.trim().is_empty() {
        tracing::debug!(client_ip = %client_ip, "login without launch data");
        return Err(ApiError::Validation);
    }

    let outcome = state
        .authenticator
        .login(&request.init_data)
        .await
        .map_err(|e| {
            if let LoginError::Rejected(reason) = &e {
                tracing::warn!(
                    client_ip = %client_ip,
                    reason = reason.reason().as_str(),
                    "telegram login rejected"
                );
            }
            ApiError::from(e)
        })?;

    Ok(Json(LoginResponse {
        expires_at: outcome.token.expires_at(),
        access_token: outcome.token.into_string(),
        token_type: "Bearer",
        is_new_user: outcome.is_new_user,
        user: outcome.user,
    }))
}

/// Returns the authenticated user's stored profile.
pub async fn me(
    State(state): State<Arc<AppState>>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state.users().find_by_id(claims.sub).await.map_err(|e| {
        tracing::error!(error = ?e, "user lookup failed");
        ApiError::Internal
    })?;

    // A valid token for a user that no longer exists.
    let Some(user) = user else {
        tracing::warn!(user_id = %claims.sub, "token subject not found");
        return Err(ApiError::Unauthenticated);
    };

    Ok(Json(MeResponse {
        user,
        expires_at: claims.expires_at(),
    }))
}
