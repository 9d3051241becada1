//! Stateless session tokens.
//!
//! Tokens use the compact JWS layout with HS256:
//! `base64url(header).base64url(claims).base64url(signature)`.
//! Nothing is stored server-side, so a token stays valid until `exp`.
//! There is no revocation list.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use courier_core::UserId;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use crate::error::{AuthFailure, AuthenticationError, SecretError};
use crate::role::Role;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime, used for every token the system issues.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Upper bound on the configured lifetime (one year).
const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

const ALGORITHM: &str = "HS256";

/// Verified contents of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Internal user id.
    pub sub: UserId,
    /// Telegram id of the user.
    pub external_id: String,
    /// Role at the time the token was minted.
    pub role: Role,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// Returns when the token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly minted token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Returns the encoded token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consumes the token, returning the encoded string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.value
    }

    /// Returns when the token expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims as they appear on the wire, before completeness checks.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClaims {
    sub: Option<String>,
    external_id: Option<String>,
    role: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Mints and verifies session tokens with one secret and one lifetime.
#[derive(Clone)]
pub struct SessionIssuer {
    mac: HmacSha256,
    ttl: Duration,
}

impl SessionIssuer {
    /// Creates an issuer.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::TooShort` if `secret` is under
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8], ttl_seconds: u64) -> Result<Self, SecretError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }
        let mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        let ttl_seconds = i64::try_from(ttl_seconds)
            .unwrap_or(MAX_TTL_SECONDS)
            .min(MAX_TTL_SECONDS);
        let ttl = Duration::seconds(ttl_seconds);
        Ok(Self { mac, ttl })
    }

    /// Mints a token for the given subject.
    #[must_use]
    pub fn mint(&self, subject: UserId, external_id: &str, role: Role) -> SessionToken {
        self.mint_at(subject, external_id, role, Utc::now())
    }

    /// Mints a token as if the current time were `now`.
    #[must_use]
    pub fn mint_at(
        &self,
        subject: UserId,
        external_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> SessionToken {
        let expires_at = now + self.ttl;
        let header = serde_json::json!({ "alg": ALGORITHM, "typ": "JWT" });
        let claims = serde_json::json!({
            "sub": subject.to_string(),
            "externalId": external_id,
            "role": role.as_str(),
            "iat": now.timestamp(),
            "exp": expires_at.timestamp(),
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        SessionToken {
            value: format!("{signing_input}.{signature}"),
            expires_at,
        }
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    ///
    /// Every failure is an `AuthenticationError`; its reason is for logs.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`SessionIssuer::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthenticationError> {
        let result = self.check(token, now);
        if let Err(e) = &result {
            tracing::debug!(reason = e.reason().as_str(), "session token rejected");
        }
        result
    }

    fn check(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthenticationError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthFailure::MalformedToken.into());
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(AuthFailure::MalformedToken.into());
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthFailure::MalformedToken)?;
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthFailure::BadSignature)?;

        let wire: WireClaims = decode_json(payload_b64)?;
        let (Some(sub), Some(external_id), Some(role), Some(iat), Some(exp)) =
            (wire.sub, wire.external_id, wire.role, wire.iat, wire.exp)
        else {
            return Err(AuthFailure::MissingClaim.into());
        };

        let sub = sub
            .parse::<UserId>()
            .map_err(|_| AuthFailure::MalformedToken)?;
        let role = role.parse::<Role>().map_err(|_| AuthFailure::MalformedToken)?;

        if now.timestamp() >= exp {
            return Err(AuthFailure::Expired.into());
        }

        Ok(Claims {
            sub,
            external_id,
            role,
            iat,
            exp,
        })
    }
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthenticationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthFailure::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthFailure::MalformedToken.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(SECRET, DEFAULT_TTL_SECONDS).expect("valid secret")
    }

    fn reason(result: Result<Claims, AuthenticationError>) -> AuthFailure {
        result.expect_err("should be rejected").reason()
    }

    fn forge(issuer_secret: &[u8], header: &str, claims: &str) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let mut mac = HmacSha256::new_from_slice(issuer_secret).expect("key");
        mac.update(input.as_bytes());
        format!(
            "{input}.{}",
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        )
    }

    #[test]
    fn short_secret_rejected() {
        let err = SessionIssuer::new(b"short", 60).expect_err("too short");
        assert_eq!(err, SecretError::TooShort { min: 32, actual: 5 });
    }

    #[test]
    fn mint_then_verify_roundtrip() {
        let issuer = issuer();
        let subject = UserId::new();
        let token = issuer.mint(subject, "777", Role::Student);

        let claims = issuer.verify(token.as_str()).expect("valid");
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.external_id, "777");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.exp, token.expires_at().timestamp());
    }

    #[test]
    fn token_has_three_url_safe_segments() {
        let token = issuer().mint(UserId::new(), "1", Role::Admin).into_string();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(!segment.is_empty());
            assert!(
                segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            );
        }
    }

    #[test]
    fn expired_token_rejected() {
        let issuer = issuer();
        let minted_at = Utc::now() - Duration::hours(2);
        let token = issuer.mint_at(UserId::new(), "1", Role::Student, minted_at);
        assert_eq!(reason(issuer.verify(token.as_str())), AuthFailure::Expired);
    }

    #[test]
    fn token_valid_until_exp() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.mint_at(UserId::new(), "1", Role::Student, now);
        let just_before = now + Duration::seconds(3599);
        let at_expiry = now + Duration::seconds(3600);
        assert!(issuer.verify_at(token.as_str(), just_before).is_ok());
        assert_eq!(
            reason(issuer.verify_at(token.as_str(), at_expiry)),
            AuthFailure::Expired
        );
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let other =
            SessionIssuer::new(b"ffffffffffffffffffffffffffffffff", 60).expect("valid secret");
        let token = other.mint(UserId::new(), "1", Role::Admin);
        assert_eq!(reason(issuer().verify(token.as_str())), AuthFailure::BadSignature);
    }

    #[test]
    fn tampered_claims_rejected() {
        let issuer = issuer();
        let token = issuer.mint(UserId::new(), "1", Role::Student).into_string();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let claims = String::from_utf8(URL_SAFE_NO_PAD.decode(&parts[1]).expect("b64"))
            .expect("utf8")
            .replace("STUDENT", "ADMIN");
        parts[1] = URL_SAFE_NO_PAD.encode(claims);
        assert_eq!(
            reason(issuer.verify(&parts.join("."))),
            AuthFailure::BadSignature
        );
    }

    #[test]
    fn missing_role_rejected() {
        let exp = Utc::now().timestamp() + 60;
        let token = forge(
            SECRET,
            r#"{"alg":"HS256","typ":"JWT"}"#,
            &format!(
                r#"{{"sub":"{}","externalId":"1","iat":0,"exp":{exp}}}"#,
                UserId::new()
            ),
        );
        assert_eq!(reason(issuer().verify(&token)), AuthFailure::MissingClaim);
    }

    #[test]
    fn missing_subject_rejected() {
        let exp = Utc::now().timestamp() + 60;
        let token = forge(
            SECRET,
            r#"{"alg":"HS256","typ":"JWT"}"#,
            &format!(r#"{{"externalId":"1","role":"ADMIN","iat":0,"exp":{exp}}}"#),
        );
        assert_eq!(reason(issuer().verify(&token)), AuthFailure::MissingClaim);
    }

    #[test]
    fn unknown_role_rejected() {
        let exp = Utc::now().timestamp() + 60;
        let token = forge(
            SECRET,
            r#"{"alg":"HS256","typ":"JWT"}"#,
            &format!(
                r#"{{"sub":"{}","externalId":"1","role":"ROOT","iat":0,"exp":{exp}}}"#,
                UserId::new()
            ),
        );
        assert_eq!(reason(issuer().verify(&token)), AuthFailure::MalformedToken);
    }

    #[test]
    fn alg_none_rejected() {
        let exp = Utc::now().timestamp() + 60;
        let token = forge(
            SECRET,
            r#"{"alg":"none","typ":"JWT"}"#,
            &format!(
                r#"{{"sub":"{}","externalId":"1","role":"ADMIN","iat":0,"exp":{exp}}}"#,
                UserId::new()
            ),
        );
        assert_eq!(reason(issuer().verify(&token)), AuthFailure::MalformedToken);
    }

    #[test]
    fn garbage_rejected() {
        let issuer = issuer();
        for token in ["", "a.b", "a.b.c.d", "not-base64!.x.y", "....."] {
            assert_eq!(reason(issuer.verify(token)), AuthFailure::MalformedToken);
        }
    }

    #[test]
    fn debug_omits_secret() {
        let rendered = format!("{:?}", issuer());
        assert!(rendered.contains("ttl"));
        assert!(!rendered.contains("0123456789"));
    }
}
