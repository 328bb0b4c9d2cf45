use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Principal, Role};

/// Signed token payload: `{id, role, iat, exp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(principal: &Principal, ttl_secs: u64) -> Self {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            id: principal.subject_id,
            role: principal.role.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

/// Any decode failure. Bad signature, expiry and malformed input are not told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid token")]
pub struct InvalidToken;

/// HS256 signer/verifier bound to one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secret_is_empty: bool,
    ttl_secs: u64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            secret_is_empty: secret.is_empty(),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue_with_ttl(principal, self.ttl_secs)
    }

    pub fn issue_with_ttl(&self, principal: &Principal, ttl_secs: u64) -> Result<String, JwtError> {
        if self.secret_is_empty {
            return Err(JwtError::InvalidSecret);
        }

        let claims = Claims::new(principal, ttl_secs);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Principal, InvalidToken> {
        if self.secret_is_empty {
            return Err(InvalidToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            InvalidToken
        })?;

        // jsonwebtoken accepts exp == now; expiry here is exclusive
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(InvalidToken);
        }

        let role: Role = data.claims.role.parse().map_err(|_| InvalidToken)?;
        Ok(Principal::new(data.claims.id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("unit-test-secret", 3600)
    }

    #[test]
    fn issued_token_decodes_to_same_principal() {
        let codec = codec();
        for principal in [
            Principal::new(0, Role::Admin),
            Principal::new(42, Role::User),
            Principal::new(i64::from(i32::MAX) + 7, Role::Admin),
        ] {
            let token = codec.issue(&principal).unwrap();
            assert_eq!(codec.decode(&token), Ok(principal));
        }
    }

    #[test]
    fn different_secret_is_rejected() {
        let token = codec().issue(&Principal::new(5, Role::User)).unwrap();
        let other = TokenCodec::new("another-secret", 3600);
        assert_eq!(other.decode(&token), Err(InvalidToken));
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let codec = codec();
        let token = codec.issue_with_ttl(&Principal::new(1, Role::Admin), 0).unwrap();
        assert_eq!(codec.decode(&token), Err(InvalidToken));
    }

    #[test]
    fn malformed_and_tampered_tokens_are_rejected() {
        let codec = codec();
        assert_eq!(codec.decode(""), Err(InvalidToken));
        assert_eq!(codec.decode("not.a.jwt"), Err(InvalidToken));

        // Admin payload spliced into a user token keeps the user's signature
        let forged = TokenCodec::new("attacker", 3600)
            .issue(&Principal::new(9, Role::Admin))
            .unwrap();
        let token = codec.issue(&Principal::new(9, Role::User)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(codec.decode(&tampered), Err(InvalidToken));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let claims = Claims {
            id: 3,
            role: "superuser".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert_eq!(codec().decode(&token), Err(InvalidToken));
    }

    #[test]
    fn empty_secret_cannot_issue() {
        let codec = TokenCodec::new("", 3600);
        assert!(matches!(
            codec.issue(&Principal::new(1, Role::User)),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn claims_carry_id_role_and_expiry() {
        let claims = Claims::new(&Principal::new(12, Role::User), 3600);
        assert_eq!(claims.id, 12);
        assert_eq!(claims.role, "user");
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}
