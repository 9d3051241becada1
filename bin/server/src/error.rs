//! Domain error types for server operations.
//!
//! `ApiError` is what handlers return. Each variant renders a fixed, generic
//! JSON body; details are logged where the error is created and never sent
//! to the client. `StartupError` covers configuration that must stop the
//! process before it binds.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_conversation::RelayError;
use courier_crypto::CodecError;
use courier_platform_access::{LoginError, SecretError};
use rootcause::prelude::Report;
use serde_json::json;
use std::fmt;

/// Request-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Missing, malformed, forged or expired credentials.
    Unauthenticated,
    /// Authenticated but the role is insufficient.
    Forbidden,
    /// The request body or path is malformed.
    Validation,
    /// The referenced entity does not exist.
    NotFound,
    /// Anything else.
    Internal,
}

impl ApiError {
    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the generic message sent to clients.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Validation => "invalid request",
            Self::NotFound => "not found",
            Self::Internal => "internal error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Rejected(_) => Self::Unauthenticated,
            LoginError::Storage => Self::Internal,
        }
    }
}

impl From<Report<RelayError>> for ApiError {
    fn from(report: Report<RelayError>) -> Self {
        let context = report.current_context();
        if context.is_not_found() {
            return Self::NotFound;
        }
        match context {
            RelayError::InvalidMessage { .. } => Self::Validation,
            _ => {
                tracing::error!(error = ?report, "relay operation failed");
                Self::Internal
            }
        }
    }
}

/// Configuration that prevents the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The encryption key is missing or malformed.
    EncryptionKey(CodecError),
    /// The session secret is unusable.
    SessionSecret(SecretError),
    /// The bot token is empty.
    MissingBotToken,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::EncryptionKey(e) => write!(f, "encryption key rejected: {e}"),
            Self::SessionSecret(e) => write!(f, "session secret rejected: {e}"),
            Self::MissingBotToken => write!(f, "telegram bot token is not configured"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<config::ConfigError> for StartupError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config {
            details: e.to_string(),
        }
    }
}

impl From<CodecError> for StartupError {
    fn from(e: CodecError) -> Self {
        Self::EncryptionKey(e)
    }
}

impl From<SecretError> for StartupError {
    fn from(e: SecretError) -> Self {
        Self::SessionSecret(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn relay_errors_map_to_generic_statuses() {
        let not_found: Report<RelayError> = RelayError::UserNotFound {
            external_id: "1".to_string(),
        }
        .into();
        assert_eq!(ApiError::from(not_found), ApiError::NotFound);

        let storage: Report<RelayError> = RelayError::Storage {
            details: "connection reset".to_string(),
        }
        .into();
        assert_eq!(ApiError::from(storage), ApiError::Internal);
    }

    #[test]
    fn startup_error_mentions_cause() {
        let err = StartupError::from(CodecError::MissingKey);
        assert!(err.to_string().starts_with("encryption key rejected"));
    }
}
