//! Postgres-backed user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::UserId;
use courier_platform_access::{Role, StoreError, TelegramIdentity, User, UserStore};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, telegram_id, first_name, last_name, username, language_code, \
                            is_premium, role, created_at, updated_at";

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    telegram_id: String,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    language_code: Option<String>,
    is_premium: bool,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, StoreError> {
        let role: Role = self.role.parse().map_err(|e| StoreError::Corrupt {
            details: format!("user {}: {e}", self.id),
        })?;
        Ok(User::with_all_fields(
            UserId::from_uuid(self.id),
            self.telegram_id,
            self.first_name,
            self.last_name,
            self.username,
            self.language_code,
            self.is_premium,
            role,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        details: e.to_string(),
    }
}

/// Repository for user operations.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Creates a new user repository.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;

        match row {
            Some(r) => Ok(Some(r.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, Report<StoreError>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match row {
            Some(r) => Ok(Some(r.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn upsert_from_identity(
        &self,
        identity: &TelegramIdentity,
        role: Role,
    ) -> Result<User, Report<StoreError>> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, telegram_id, first_name, last_name, username, language_code,
                               is_premium, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (telegram_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                language_code = EXCLUDED.language_code,
                is_premium = EXCLUDED.is_premium,
                role = EXCLUDED.role,
                updated_at = now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(UserId::new().as_uuid())
        .bind(identity.external_id())
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.username)
        .bind(&identity.language_code)
        .bind(identity.is_premium.unwrap_or(false))
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(row.try_into_user()?)
    }
}
