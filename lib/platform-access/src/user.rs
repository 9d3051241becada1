//! User domain type.
//!
//! A User is created on the first successful Telegram login and refreshed
//! on every later one. Users are keyed by their Telegram id; the internal
//! `id` is what session tokens carry as their subject.

use chrono::{DateTime, Utc};
use courier_core::UserId;
use serde::{Deserialize, Serialize};

use crate::init_data::TelegramIdentity;
use crate::role::Role;

/// An application user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal platform user ID.
    id: UserId,
    /// Telegram user id, unique across users.
    external_id: String,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    language_code: Option<String>,
    is_premium: bool,
    /// Current role.
    role: Role,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user from a verified Telegram identity.
    #[must_use]
    pub fn from_identity(identity: &TelegramIdentity, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            external_id: identity.external_id(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            username: identity.username.clone(),
            language_code: identity.language_code.clone(),
            is_premium: identity.is_premium.unwrap_or(false),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        external_id: String,
        first_name: String,
        last_name: Option<String>,
        username: Option<String>,
        language_code: Option<String>,
        is_premium: bool,
        role: Role,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            external_id,
            first_name,
            last_name,
            username,
            language_code,
            is_premium,
            role,
            created_at,
            updated_at,
        }
    }

    /// Returns the user's internal platform ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the Telegram id.
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn language_code(&self) -> Option<&str> {
        self.language_code.as_deref()
    }

    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.is_premium
    }

    /// Returns the current role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Copies display fields from a fresh identity.
    ///
    /// The external id never changes.
    pub fn refresh_from(&mut self, identity: &TelegramIdentity) {
        self.first_name = identity.first_name.clone();
        self.last_name = identity.last_name.clone();
        self.username = identity.username.clone();
        self.language_code = identity.language_code.clone();
        self.is_premium = identity.is_premium.unwrap_or(false);
        self.updated_at = Utc::now();
    }

    /// Sets the role.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> TelegramIdentity {
        TelegramIdentity {
            id: 1001,
            first_name: "Alice".to_string(),
            last_name: None,
            username: Some("alice".to_string()),
            language_code: Some("en".to_string()),
            is_premium: None,
        }
    }

    #[test]
    fn from_identity_copies_fields() {
        let user = User::from_identity(&identity(), Role::Student);
        assert_eq!(user.external_id(), "1001");
        assert_eq!(user.first_name(), "Alice");
        assert_eq!(user.username(), Some("alice"));
        assert!(!user.is_premium());
        assert_eq!(user.role(), Role::Student);
        assert_eq!(user.created_at(), user.updated_at());
    }

    #[test]
    fn refresh_updates_display_fields_and_timestamp() {
        let mut user = User::from_identity(&identity(), Role::Student);
        let original_updated_at = user.updated_at();
        let id = user.id();

        std::thread::sleep(std::time::Duration::from_millis(2));

        let mut renamed = identity();
        renamed.first_name = "Alicia".to_string();
        renamed.is_premium = Some(true);
        user.refresh_from(&renamed);

        assert_eq!(user.id(), id);
        assert_eq!(user.first_name(), "Alicia");
        assert!(user.is_premium());
        assert!(user.updated_at() > original_updated_at);
    }

    #[test]
    fn with_all_fields_preserves_values() {
        let id = UserId::new();
        let created = Utc::now() - chrono::Duration::days(30);
        let updated = Utc::now() - chrono::Duration::days(1);

        let user = User::with_all_fields(
            id,
            "42".to_string(),
            "Bob".to_string(),
            Some("Builder".to_string()),
            None,
            Some("de".to_string()),
            true,
            Role::Admin,
            created,
            updated,
        );

        assert_eq!(user.id(), id);
        assert_eq!(user.last_name(), Some("Builder"));
        assert_eq!(user.language_code(), Some("de"));
        assert_eq!(user.role(), Role::Admin);
        assert_eq!(user.created_at(), created);
        assert_eq!(user.updated_at(), updated);
    }

    #[test]
    fn user_serialization_roundtrip() {
        let user = User::from_identity(&identity(), Role::ContactPerson);
        let json = serde_json::to_string(&user).expect("serialize");
        let parsed: User = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(user, parsed);
    }
}
