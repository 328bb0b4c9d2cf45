use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Principal, TokenCodec};
use crate::error::ApiError;

/// Resolve the caller from `Authorization: Bearer <token>`.
///
/// Never errors: a missing header, a non-Bearer scheme, an empty token and a
/// token that fails verification all read as "no principal".
pub fn verify(headers: &HeaderMap, codec: &TokenCodec) -> Option<Principal> {
    let token = extract_bearer(headers)?;
    match codec.decode(token) {
        Ok(principal) => Some(principal),
        Err(_) => {
            tracing::debug!("Rejected bearer token");
            None
        }
    }
}

/// Admin-only gate: 401 without a valid token, 403 for a non-admin role.
pub fn require_admin(headers: &HeaderMap, codec: &TokenCodec) -> Result<Principal, ApiError> {
    let principal = verify(headers, codec).ok_or_else(|| ApiError::unauthorized("Access token required"))?;
    if !principal.is_admin() {
        tracing::warn!("Subject {} with role {} denied admin access", principal.subject_id, principal.role);
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(principal)
}

/// Middleware form of [`require_admin`]. On success the principal is
/// inserted into the request extensions for handlers to extract.
pub async fn admin_gate(
    State(codec): State<TokenCodec>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = require_admin(request.headers(), &codec)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::http::{HeaderValue, StatusCode};

    fn codec() -> TokenCodec {
        TokenCodec::new("gate-secret", 3600)
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let codec = codec();
        let token = codec.issue(&Principal::new(5, Role::User)).unwrap();
        let principal = verify(&bearer(&format!("bearer {}", token)), &codec).unwrap();
        assert_eq!(principal, Principal::new(5, Role::User));
    }

    #[test]
    fn verify_returns_none_for_bad_headers() {
        let codec = codec();
        assert!(verify(&HeaderMap::new(), &codec).is_none());
        assert!(verify(&bearer("Basic dXNlcjpwYXNz"), &codec).is_none());
        assert!(verify(&bearer("Bearer "), &codec).is_none());
        assert!(verify(&bearer("Bearer not.a.jwt"), &codec).is_none());
    }

    #[test]
    fn gate_outcomes() {
        let codec = codec();

        let missing = require_admin(&HeaderMap::new(), &codec).unwrap_err();
        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing.message(), "Access token required");

        let malformed = require_admin(&bearer("Bearer garbage"), &codec).unwrap_err();
        assert_eq!(malformed.status_code(), StatusCode::UNAUTHORIZED);

        let user_token = codec.issue(&Principal::new(3, Role::User)).unwrap();
        let denied = require_admin(&bearer(&format!("Bearer {}", user_token)), &codec).unwrap_err();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(denied.message(), "Admin access required");

        let admin_token = codec.issue(&Principal::bootstrap_admin()).unwrap();
        let admin = require_admin(&bearer(&format!("Bearer {}", admin_token)), &codec).unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.subject_id, 0);
    }

    #[test]
    fn foreign_secret_is_unauthenticated() {
        let other = TokenCodec::new("someone-else", 3600);
        let token = other.issue(&Principal::bootstrap_admin()).unwrap();
        let err = require_admin(&bearer(&format!("Bearer {}", token)), &codec()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
