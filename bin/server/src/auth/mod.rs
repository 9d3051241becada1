//! Authentication module for the courier server.
//!
//! This module provides:
//! - Telegram WebApp login exchanging launch data for a session token
//! - Bearer-token extractors for Axum routes
//! - The shared application state
//!
//! # Authorization Model
//!
//! Session tokens are stateless and carry the user's role. Each protected
//! request is authenticated from the `Authorization` header alone; admin
//! routes additionally require `Role::Admin`. Role changes made by the
//! admin allow-list take effect on the user's next login.
//!
//! The state holds a `ConversationRelay`, which can seal and list messages
//! but has no decrypt operation. Nothing in this crate builds a `BotRelay`.

pub mod middleware;
pub mod routes;

use courier_conversation::{ConversationRelay, RelayStore};
use courier_crypto::EncryptionCodec;
use courier_platform_access::{
    AuthorizationGate, Authenticator, InitDataVerifier, RoleReconciler, SessionIssuer, UserStore,
};
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::StartupError;

pub use middleware::{ClientIp, RequireAdmin, RequireAuth};
pub use routes::{me, telegram_webapp};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Login flow.
    pub authenticator: Authenticator,
    /// Bearer token verification.
    pub gate: AuthorizationGate,
    /// Metadata-only relay for admin routes.
    pub relay: ConversationRelay,
    /// Peers whose `X-Forwarded-For` header is honoured.
    pub trusted_proxies: Vec<IpAddr>,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(
        authenticator: Authenticator,
        gate: AuthorizationGate,
        relay: ConversationRelay,
    ) -> Self {
        Self {
            authenticator,
            gate,
            relay,
            trusted_proxies: Vec::new(),
        }
    }

    /// Sets the proxies trusted to report the client address.
    #[must_use]
    pub fn with_trusted_proxies(mut self, trusted_proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }

    /// Builds the state from configuration and storage.
    ///
    /// # Errors
    ///
    /// Fails when the encryption key, session secret or trusted proxy list
    /// is unusable.
    pub fn from_config(
        config: &ServerConfig,
        users: Arc<dyn UserStore>,
        relay_store: Arc<dyn RelayStore>,
    ) -> Result<Self, StartupError> {
        let key = config.encryption.key()?;
        let trusted_proxies = config.trusted_proxies()?;
        let sealer = EncryptionCodec::new(&key).sealer();

        let issuer = Arc::new(SessionIssuer::new(
            config.session.secret.as_bytes(),
            config.session.ttl_seconds,
        )?);
        let authenticator = Authenticator::new(
            InitDataVerifier::new(
                config.telegram.bot_token.as_bytes(),
                config.telegram.init_data_max_age_seconds,
            ),
            RoleReconciler::new(config.telegram.admin_ids()),
            Arc::clone(&issuer),
            users,
        );

        Ok(Self::new(
            authenticator,
            AuthorizationGate::new(issuer),
            ConversationRelay::new(relay_store, sealer),
        )
        .with_trusted_proxies(trusted_proxies))
    }

    /// Returns the user directory.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        self.authenticator.users()
    }
}
