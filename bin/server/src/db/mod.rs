//! Database repositories for courier.
//!
//! This module provides Postgres implementations of the storage seams:
//! - `PgUserStore`: the user directory
//! - `PgRelayStore`: contacts, conversations and the message log

pub mod relay;
pub mod user;

pub use relay::PgRelayStore;
pub use user::PgUserStore;

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
