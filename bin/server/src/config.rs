//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use `__` as the separator, so `SESSION__TTL_SECONDS` sets
//! `session.ttl_seconds`.
//!
//! Values are kept as strings until serde reads them into typed fields, so
//! an all-digit secret or Telegram id is never rewritten as a number.

use courier_crypto::EncryptionKey;
use courier_platform_access::init_data::DEFAULT_MAX_AGE_SECONDS;
use courier_platform_access::token::DEFAULT_TTL_SECONDS;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

use crate::error::StartupError;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Comma-separated proxy addresses whose `X-Forwarded-For` is trusted.
    #[serde(default)]
    pub trusted_proxies: String,

    /// Telegram bot configuration.
    pub telegram: TelegramConfig,

    /// Session token configuration.
    pub session: SessionConfig,

    /// Message encryption configuration.
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// Telegram-related configuration.
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; also the secret launch data is signed with.
    pub bot_token: String,

    /// Maximum accepted age of launch data, in seconds.
    #[serde(default = "default_init_data_max_age_seconds")]
    pub init_data_max_age_seconds: u32,

    /// Comma-separated Telegram ids that hold the admin role.
    #[serde(default)]
    pub admin_ids: String,
}

/// Session-related configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC signing secret, at least 32 bytes.
    pub secret: String,

    /// Token lifetime in seconds. One value for every token.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

/// Encryption-related configuration.
#[derive(Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// The AES-256 key as 64 hex characters. No default exists.
    #[serde(default)]
    pub key: String,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_init_data_max_age_seconds() -> u32 {
    DEFAULT_MAX_AGE_SECONDS
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECONDS
}

impl TelegramConfig {
    /// Returns the parsed admin allow-list.
    #[must_use]
    pub fn admin_ids(&self) -> Vec<String> {
        self.admin_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ServerConfig {
    /// Parses the trusted proxy list.
    ///
    /// # Errors
    ///
    /// `StartupError::Config` if an entry is not an IP address.
    pub fn trusted_proxies(&self) -> Result<Vec<IpAddr>, StartupError> {
        self.trusted_proxies
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry.parse().map_err(|_| StartupError::Config {
                    details: format!("trusted proxy {entry:?} is not an IP address"),
                })
            })
            .collect()
    }
}

impl EncryptionConfig {
    /// Parses the configured key.
    ///
    /// # Errors
    ///
    /// `MissingKey` when unset, `InvalidKey` when not 64 hex characters.
    pub fn key(&self) -> Result<EncryptionKey, courier_crypto::CodecError> {
        EncryptionKey::from_hex(&self.key)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("init_data_max_age_seconds", &self.init_data_max_age_seconds)
            .field("admin_ids", &self.admin_ids)
            .finish()
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(source: config::Environment) -> Result<Self, StartupError> {
        let config: Self = config::Config::builder()
            .add_source(source.separator("__"))
            .build()?
            .try_deserialize()?;
        if config.telegram.bot_token.trim().is_empty() {
            return Err(StartupError::MissingBotToken);
        }
        Ok(config)
    }
}
