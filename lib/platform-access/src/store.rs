//! User directory.
//!
//! [`UserStore`] is the persistence seam for users. The server backs it with
//! Postgres; [`MemoryUserStore`] backs tests and local tooling.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use courier_core::UserId;
use rootcause::prelude::Report;

use crate::error::StoreError;
use crate::init_data::TelegramIdentity;
use crate::role::Role;
use crate::user::User;

/// Persistent storage for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks a user up by internal id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>>;

    /// Looks a user up by Telegram id.
    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<User>, Report<StoreError>>;

    /// Inserts or refreshes the user for `identity` and sets `role`.
    ///
    /// Two concurrent calls for the same Telegram id must converge on one
    /// row.
    async fn upsert_from_identity(
        &self,
        identity: &TelegramIdentity,
        role: Role,
    ) -> Result<User, Report<StoreError>>;
}

/// In-memory user store.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user as-is, replacing any user with the same Telegram id.
    pub fn insert(&self, user: User) -> Result<(), Report<StoreError>> {
        self.lock()?.insert(user.external_id().to_string(), user);
        Ok(())
    }

    /// Number of stored users.
    pub fn user_count(&self) -> Result<usize, Report<StoreError>> {
        Ok(self.lock()?.len())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, User>>, Report<StoreError>> {
        self.users.lock().map_err(|_| {
            StoreError::Unavailable {
                details: "user map lock poisoned".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        Ok(self.lock()?.values().find(|u| u.id() == id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, Report<StoreError>> {
        Ok(self.lock()?.get(external_id).cloned())
    }

    async fn upsert_from_identity(
        &self,
        identity: &TelegramIdentity,
        role: Role,
    ) -> Result<User, Report<StoreError>> {
        let mut users = self.lock()?;
        let user = users
            .entry(identity.external_id())
            .and_modify(|existing| {
                existing.refresh_from(identity);
                if existing.role() != role {
                    existing.set_role(role);
                }
            })
            .or_insert_with(|| User::from_identity(identity, role));
        tracing::debug!(user_id = %user.id(), role = %user.role(), "user upserted");
        Ok(user.clone())
    }
}
