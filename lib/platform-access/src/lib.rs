//! Platform access, authentication, and authorization for courier.
//!
//! This crate provides:
//! - Telegram WebApp launch data verification (`InitDataVerifier`)
//! - Stateless signed session tokens (`SessionIssuer`, `Claims`)
//! - Bearer authentication and role gating (`AuthorizationGate`, `require_role`)
//! - Users and the user directory seam (`User`, `UserStore`)
//! - Admin allow-list reconciliation (`RoleReconciler`)
//! - The login flow tying these together (`Authenticator`)
//!
//! # Access Control Model
//!
//! Every user holds exactly one [`Role`]. `Admin` is granted and revoked
//! only by the configured allow-list of Telegram ids, re-checked on every
//! login. Tokens carry the role; gates never consult storage.
//!
//! # Example
//!
//! ```
//! use courier_core::UserId;
//! use courier_platform_access::{AuthorizationGate, Role, SessionIssuer, require_role};
//! use std::sync::Arc;
//!
//! let issuer = SessionIssuer::new(b"an-example-secret-of-32-bytes-min", 3600)
//!     .expect("secret long enough");
//! let token = issuer.mint(UserId::new(), "1001", Role::Admin);
//!
//! let gate = AuthorizationGate::new(Arc::new(issuer));
//! let header = format!("Bearer {}", token.as_str());
//! let claims = gate.authenticate(Some(&header)).expect("valid token");
//!
//! assert!(require_role(Some(&claims), Role::Admin).is_ok());
//! assert!(require_role(Some(&claims), Role::Student).is_err());
//! ```

pub mod auth;
pub mod error;
pub mod gate;
pub mod init_data;
pub mod reconcile;
pub mod role;
pub mod store;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use auth::{Authenticator, LoginOutcome};
pub use error::{
    AccessError, AuthFailure, AuthenticationError, AuthorizationError, LoginError, SecretError,
    StoreError,
};
pub use gate::{AuthorizationGate, extract_bearer, has_token_shape, require_role};
pub use init_data::{
    InitDataVerifier, TelegramIdentity, VerifiedInitData, sign_init_data, verify_init_data,
};
pub use reconcile::{RoleChange, RoleDecision, RoleReconciler};
pub use role::{ParseRoleError, Role};
pub use store::{MemoryUserStore, UserStore};
pub use token::{Claims, SessionIssuer, SessionToken};
pub use user::User;
