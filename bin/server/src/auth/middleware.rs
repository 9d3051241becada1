//! Authentication middleware and extractors for Axum.
//!
//! Failed attempts are logged with the caller's address and a generic
//! reason. The token itself is never logged.

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use courier_platform_access::{AccessError, Claims, Role, require_role};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// The caller's address, for security logs.
///
/// This is the socket peer. When the peer is a configured trusted proxy,
/// the rightmost `X-Forwarded-For` hop that is not itself a trusted proxy
/// is used instead. Without connection info the address is `"unknown"`.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl ClientIp {
    fn resolve(parts: &Parts, trusted_proxies: &[IpAddr]) -> Self {
        let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() else {
            return Self("unknown".to_string());
        };
        let peer = peer.ip();

        let client = if trusted_proxies.contains(&peer) {
            forwarded_client(parts, trusted_proxies).unwrap_or(peer)
        } else {
            peer
        };
        Self(client.to_string())
    }
}

fn forwarded_client(parts: &Parts, trusted_proxies: &[IpAddr]) -> Option<IpAddr> {
    let header = parts.headers.get(FORWARDED_FOR)?.to_str().ok()?;
    header
        .split(',')
        .rev()
        .map(|hop| hop.trim().parse::<IpAddr>())
        .map_while(Result::ok)
        .find(|hop| !trusted_proxies.contains(hop))
}

impl<S> FromRequestParts<S> for ClientIp
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        Ok(Self::resolve(parts, &app_state.trusted_proxies))
    }
}

/// Extractor for requiring an authenticated caller.
///
/// The verified claims are also stored in the request extensions.
pub struct RequireAuth(pub Claims);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(RequireAuth(claims.clone()));
        }

        let app_state = Arc::<AppState>::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().unwrap_or_default());

        match app_state.gate.authenticate(header) {
            Ok(claims) => {
                parts.extensions.insert(claims.clone());
                Ok(RequireAuth(claims))
            }
            Err(e) => {
                let ClientIp(client_ip) = ClientIp::resolve(parts, &app_state.trusted_proxies);
                tracing::warn!(
                    client_ip = %client_ip,
                    reason = e.reason().as_str(),
                    path = %parts.uri.path(),
                    "authentication failed"
                );
                Err(ApiError::Unauthenticated)
            }
        }
    }
}

/// Extractor for requiring an authenticated admin.
pub struct RequireAdmin(pub Claims);

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        match require_role(Some(&claims), Role::Admin) {
            Ok(()) => Ok(RequireAdmin(claims)),
            Err(AccessError::Authentication(_)) => Err(ApiError::Unauthenticated),
            Err(AccessError::Authorization(e)) => {
                let app_state = Arc::<AppState>::from_ref(state);
                let ClientIp(client_ip) = ClientIp::resolve(parts, &app_state.trusted_proxies);
                tracing::warn!(
                    client_ip = %client_ip,
                    user_id = %claims.sub,
                    reason = %e,
                    path = %parts.uri.path(),
                    "admin access denied"
                );
                Err(ApiError::Forbidden)
            }
        }
    }
}
