//! The Telegram WebApp login flow.
//!
//! A login exchanges raw launch data for a session token:
//! 1. Verify the launch data signature and freshness
//! 2. Require an embedded Telegram user
//! 3. Reconcile the stored role against the admin allow-list
//! 4. Upsert the user with the reconciled role
//! 5. Mint a session token carrying the user's id and role

use std::sync::Arc;

use crate::error::{AuthFailure, AuthenticationError, LoginError};
use crate::init_data::InitDataVerifier;
use crate::reconcile::RoleReconciler;
use crate::store::UserStore;
use crate::token::{SessionIssuer, SessionToken};
use crate::user::User;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The stored user after the upsert.
    pub user: User,
    /// The freshly minted session token.
    pub token: SessionToken,
    /// Whether this login created the user.
    pub is_new_user: bool,
}

/// Runs the Telegram login flow.
#[derive(Clone)]
pub struct Authenticator {
    verifier: InitDataVerifier,
    reconciler: RoleReconciler,
    issuer: Arc<SessionIssuer>,
    users: Arc<dyn UserStore>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("verifier", &self.verifier)
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator.
    #[must_use]
    pub fn new(
        verifier: InitDataVerifier,
        reconciler: RoleReconciler,
        issuer: Arc<SessionIssuer>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            verifier,
            reconciler,
            issuer,
            users,
        }
    }

    /// Returns the session issuer.
    #[must_use]
    pub fn issuer(&self) -> &Arc<SessionIssuer> {
        &self.issuer
    }

    /// Returns the user directory.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Exchanges raw launch data for a session.
    ///
    /// # Errors
    ///
    /// `LoginError::Rejected` when the launch data fails verification or
    /// carries no user, `LoginError::Storage` when the user directory fails.
    pub async fn login(&self, raw_init_data: &str) -> Result<LoginOutcome, LoginError> {
        let rejected =
            || LoginError::Rejected(AuthenticationError::new(AuthFailure::InvalidInitData));

        let verified = self.verifier.verify(raw_init_data).ok_or_else(rejected)?;
        let Some(identity) = verified.user else {
            tracing::debug!("launch data carries no user");
            return Err(rejected());
        };
        let external_id = identity.external_id();

        let existing = self
            .users
            .find_by_external_id(&external_id)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "user lookup failed during login");
                LoginError::Storage
            })?;

        let decision = self
            .reconciler
            .reconcile(&external_id, existing.as_ref().map(User::role));

        let user = self
            .users
            .upsert_from_identity(&identity, decision.role)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "user upsert failed during login");
                LoginError::Storage
            })?;

        let token = self.issuer.mint(user.id(), user.external_id(), user.role());
        let is_new_user = existing.is_none();

        tracing::info!(
            user_id = %user.id(),
            role = %user.role(),
            is_new_user,
            "telegram login succeeded"
        );

        Ok(LoginOutcome {
            user,
            token,
            is_new_user,
        })
    }
}
