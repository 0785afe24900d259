use crate::error::ApiError;
use crate::token::Claims;

/// Identity resolved by the auth middleware and attached to the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
    /// Credential expiry, unix seconds. Carried for `GET /api/session`.
    pub exp: usize,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            is_admin: claims.is_admin,
            exp: claims.exp,
        }
    }
}

/// Admin-only capability check.
pub fn require_admin(actor: &CurrentUser) -> Result<(), ApiError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("administrator access required".into()))
    }
}

/// Ownership check: the actor may touch the resource if it is their own or
/// they are an admin.
pub fn require_self_or_admin(actor: &CurrentUser, owner_id: &str) -> Result<(), ApiError> {
    if actor.is_admin || actor.id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "you can only access your own account".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, is_admin: bool) -> CurrentUser {
        CurrentUser {
            id: id.to_string(),
            username: "tester".into(),
            is_admin,
            exp: 0,
        }
    }

    #[test]
    fn test_admin_gate() {
        assert!(require_admin(&user("u1", true)).is_ok());
        assert!(require_admin(&user("u1", false)).is_err());
    }

    #[test]
    fn test_self_or_admin() {
        // Own resource always passes.
        assert!(require_self_or_admin(&user("u1", false), "u1").is_ok());
        // Someone else's resource needs the admin flag.
        assert!(require_self_or_admin(&user("u1", false), "u2").is_err());
        assert!(require_self_or_admin(&user("u1", true), "u2").is_ok());
    }
}
