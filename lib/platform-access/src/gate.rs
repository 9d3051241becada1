//! Request-level authentication and role gating.
//!
//! The gate is framework-agnostic: it takes the raw `Authorization` header
//! value and returns verified [`Claims`]. Web layers attach the claims to
//! the request and call [`require_role`] for privileged routes.

use std::sync::Arc;

use crate::error::{AccessError, AuthFailure, AuthenticationError, AuthorizationError};
use crate::role::Role;
use crate::token::{Claims, SessionIssuer};

const BEARER: &str = "Bearer";

/// Extracts the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, `Bearer` and a
/// non-empty token.
///
/// # Errors
///
/// `MissingCredentials` when no header was sent, `MalformedHeader` for any
/// other shape.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthenticationError> {
    let header = header.ok_or(AuthFailure::MissingCredentials)?;
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthFailure::MalformedHeader.into()),
    }
}

/// Cheap structural check run before any signature verification.
///
/// Accepts exactly three non-empty dot-separated segments drawn from the
/// base64url alphabet.
#[must_use]
pub fn has_token_shape(token: &str) -> bool {
    let mut count = 0;
    for segment in token.split('.') {
        count += 1;
        if count > 3 || segment.is_empty() {
            return false;
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return false;
        }
    }
    count == 3
}

/// Checks already-verified claims against a required role.
///
/// Absent claims mean the request was never authenticated, which is an
/// authentication failure rather than a forbidden one.
///
/// # Errors
///
/// `AccessError::Authentication` when `claims` is `None`,
/// `AccessError::Authorization` when the role differs.
pub fn require_role(claims: Option<&Claims>, required: Role) -> Result<(), AccessError> {
    let claims = claims.ok_or(AuthenticationError::new(AuthFailure::MissingCredentials))?;
    if claims.role != required {
        return Err(AuthorizationError::InsufficientRole {
            required,
            actual: claims.role,
        }
        .into());
    }
    Ok(())
}

/// Authenticates requests by bearer token.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    issuer: Arc<SessionIssuer>,
}

impl AuthorizationGate {
    /// Creates a gate backed by `issuer`.
    #[must_use]
    pub fn new(issuer: Arc<SessionIssuer>) -> Self {
        Self { issuer }
    }

    /// Returns the underlying issuer.
    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Verifies the `Authorization` header value and returns its claims.
    ///
    /// # Errors
    ///
    /// Any failure is an `AuthenticationError`.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, AuthenticationError> {
        let token = extract_bearer(authorization)?;
        if !has_token_shape(token) {
            return Err(AuthFailure::MalformedToken.into());
        }
        self.issuer.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::UserId;

    fn gate() -> AuthorizationGate {
        let issuer = SessionIssuer::new(b"gate-test-secret-gate-test-secret", 3600)
            .expect("valid secret");
        AuthorizationGate::new(Arc::new(issuer))
    }

    fn claims(role: Role) -> Claims {
        Claims {
            sub: UserId::new(),
            external_id: "1".to_string(),
            role,
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn failure(result: Result<Claims, AuthenticationError>) -> AuthFailure {
        result.expect_err("should fail").reason()
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn rejects_other_header_shapes() {
        for header in [
            "bearer abc",
            "Basic abc",
            "Bearer",
            "Bearer ",
            "Bearer  abc",
            "Bearer abc def",
            " Bearer abc",
            "abc",
        ] {
            assert_eq!(
                extract_bearer(Some(header)).expect_err(header).reason(),
                AuthFailure::MalformedHeader,
                "{header:?}"
            );
        }
    }

    #[test]
    fn missing_header_is_missing_credentials() {
        assert_eq!(
            extract_bearer(None).expect_err("missing").reason(),
            AuthFailure::MissingCredentials
        );
    }

    #[test]
    fn token_shape_check() {
        assert!(has_token_shape("a.b.c"));
        assert!(has_token_shape("eyJh_-.Zm9v.YmFy"));
        assert!(!has_token_shape("a.b"));
        assert!(!has_token_shape("a.b.c.d"));
        assert!(!has_token_shape("a..c"));
        assert!(!has_token_shape(".b.c"));
        assert!(!has_token_shape("a.b.c="));
        assert!(!has_token_shape("a.b+.c"));
        assert!(!has_token_shape(""));
    }

    #[test]
    fn authenticate_accepts_minted_token() {
        let gate = gate();
        let subject = UserId::new();
        let token = gate.issuer().mint(subject, "55", Role::ContactPerson);
        let header = format!("Bearer {}", token.as_str());

        let claims = gate.authenticate(Some(&header)).expect("authenticated");
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.role, Role::ContactPerson);
    }

    #[test]
    fn authenticate_short_circuits_on_bad_shape() {
        assert_eq!(
            failure(gate().authenticate(Some("Bearer not-a-token"))),
            AuthFailure::MalformedToken
        );
    }

    #[test]
    fn authenticate_rejects_forged_token() {
        assert_eq!(
            failure(gate().authenticate(Some("Bearer eyJh.eyJz.c2ln"))),
            AuthFailure::MalformedToken
        );
    }

    #[test]
    fn require_admin_accepts_admin() {
        assert!(require_role(Some(&claims(Role::Admin)), Role::Admin).is_ok());
    }

    #[test]
    fn require_admin_forbids_other_roles() {
        for role in [Role::Student, Role::ContactPerson] {
            let err = require_role(Some(&claims(role)), Role::Admin).expect_err("forbidden");
            assert_eq!(
                err,
                AccessError::Authorization(AuthorizationError::InsufficientRole {
                    required: Role::Admin,
                    actual: role,
                })
            );
        }
    }

    #[test]
    fn require_role_without_claims_is_unauthenticated() {
        let err = require_role(None, Role::Admin).expect_err("no claims");
        assert!(matches!(err, AccessError::Authentication(_)));
    }
}
