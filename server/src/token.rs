use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Cookie the session credential travels in.
pub const COOKIE_NAME: &str = "token";

/// Fixed credential lifetime. There is no refresh or rotation; expiry forces
/// a fresh login.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub is_admin: bool,
    pub exp: usize,
}

/// Mint a session credential for the given identity.
pub fn mint(secret: &str, user_id: &str, username: &str, is_admin: bool) -> Result<String, ApiError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(SESSION_TTL_HOURS))
        .ok_or_else(|| ApiError::Internal("clock overflow computing expiry".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        is_admin,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("JWT encode failed: {e}")))
}

/// Verify signature and expiry, distinguishing an expired credential from a
/// tampered or malformed one.
pub fn verify(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::TokenExpired,
        _ => ApiError::TokenInvalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_mint_verify_round_trip() {
        let token = mint(SECRET, "user-1", "alice", false).unwrap();
        let claims = verify(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let token = mint(SECRET, "user-1", "alice", false).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            verify(SECRET, &tampered),
            Err(ApiError::TokenInvalid)
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = mint(SECRET, "user-1", "alice", true).unwrap();
        assert!(matches!(
            verify("other-secret", &token),
            Err(ApiError::TokenInvalid)
        ));
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        // Hand-roll claims already past expiry (beyond the default leeway).
        let claims = Claims {
            sub: "user-1".into(),
            username: "alice".into(),
            is_admin: false,
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verify(SECRET, &token),
            Err(ApiError::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_is_invalid_not_expired() {
        assert!(matches!(
            verify(SECRET, "not-a-jwt"),
            Err(ApiError::TokenInvalid)
        ));
    }
}
