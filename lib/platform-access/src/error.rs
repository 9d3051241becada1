//! Error types for the platform-access crate.
//!
//! - `AuthenticationError`: the caller could not be identified. Every cause
//!   renders the same generic message; the cause is kept for logs only.
//! - `AuthorizationError`: the caller is known but lacks the required role.
//! - `AccessError`: either of the above, returned by role gates.
//! - `StoreError`: the user directory failed.
//! - `SecretError`: the session signing secret is unusable.
//! - `LoginError`: the Telegram login flow failed.

use crate::role::Role;
use std::fmt;

/// Why authentication failed. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No credentials were presented.
    MissingCredentials,
    /// The `Authorization` header is not `Bearer <token>`.
    MalformedHeader,
    /// The token failed the structural pre-check or could not be decoded.
    MalformedToken,
    /// The token signature did not verify.
    BadSignature,
    /// A required claim is absent.
    MissingClaim,
    /// The token is past its expiry.
    Expired,
    /// Telegram launch data failed verification.
    InvalidInitData,
}

impl AuthFailure {
    /// Short machine-readable label for structured logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::MalformedHeader => "malformed_header",
            Self::MalformedToken => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::MissingClaim => "missing_claim",
            Self::Expired => "expired",
            Self::InvalidInitData => "invalid_init_data",
        }
    }
}

/// The caller could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationError {
    reason: AuthFailure,
}

impl AuthenticationError {
    /// Creates an error with an internal reason.
    #[must_use]
    pub fn new(reason: AuthFailure) -> Self {
        Self { reason }
    }

    /// Returns the internal reason, for logging and metrics only.
    #[must_use]
    pub fn reason(&self) -> AuthFailure {
        self.reason
    }
}

impl From<AuthFailure> for AuthenticationError {
    fn from(reason: AuthFailure) -> Self {
        Self::new(reason)
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed")
    }
}

impl std::error::Error for AuthenticationError {}

/// The caller is authenticated but not allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The caller's role does not match the required role.
    InsufficientRole { required: Role, actual: Role },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientRole { required, actual } => {
                write!(f, "role {actual} does not satisfy required role {required}")
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Failure of a role gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No verified claims were available.
    Authentication(AuthenticationError),
    /// Claims were present but the role is wrong.
    Authorization(AuthorizationError),
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(e) => e.fmt(f),
            Self::Authorization(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for AccessError {}

impl From<AuthenticationError> for AccessError {
    fn from(e: AuthenticationError) -> Self {
        Self::Authentication(e)
    }
}

impl From<AuthorizationError> for AccessError {
    fn from(e: AuthorizationError) -> Self {
        Self::Authorization(e)
    }
}

/// Errors from the user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the query.
    Unavailable { details: String },
    /// A stored row could not be decoded.
    Corrupt { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => write!(f, "user store unavailable: {details}"),
            Self::Corrupt { details } => write!(f, "corrupt user record: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// The session signing secret is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// The secret is shorter than the minimum length.
    TooShort { min: usize, actual: usize },
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { min, actual } => {
                write!(f, "session secret must be at least {min} bytes, got {actual}")
            }
        }
    }
}

impl std::error::Error for SecretError {}

/// Errors from the Telegram login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Launch data was rejected or carried no user.
    Rejected(AuthenticationError),
    /// The user directory failed.
    Storage,
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => e.fmt(f),
            Self::Storage => write!(f, "user directory unavailable"),
        }
    }
}

impl std::error::Error for LoginError {}
