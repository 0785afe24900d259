use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every failure a handler can produce, mapped onto the API's error contract.
///
/// Expired and malformed credentials are deliberately distinct variants so
/// clients can tell "log in again" apart from "something is wrong with your
/// request".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("username or email already in use")]
    Conflict,

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("session expired, please log in again")]
    TokenExpired,

    #[error("invalid authentication token")]
    TokenInvalid,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("new registrations are currently disabled")]
    RegistrationClosed,

    #[error("system is under maintenance, please try again later")]
    Maintenance,

    #[error("too many attempts, please try again later")]
    RateLimited,

    #[error("database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("internal server error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::TokenExpired
            | ApiError::TokenInvalid
            | ApiError::Forbidden(_)
            | ApiError::RegistrationClosed => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict => "CONFLICT",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::TokenInvalid => "TOKEN_INVALID",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RegistrationClosed => "REGISTRATION_CLOSED",
            ApiError::Maintenance => "MAINTENANCE",
            ApiError::RateLimited => "RATE_LIMITED",
            ApiError::Database(_) => "INTERNAL",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 5xx details go to the log, never to the client.
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {e}"),
            ApiError::Internal(msg) => tracing::error!("internal error: {msg}"),
            _ => {}
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Map a store error onto the conflict contract: unique-constraint violations
/// become a generic 400 that does not leak which field collided.
pub fn map_unique_violation(e: sea_orm::DbErr) -> ApiError {
    if e.to_string().contains("UNIQUE constraint failed") {
        ApiError::Conflict
    } else {
        ApiError::Database(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        // Conflicts are 400, not 409, per the API contract.
        assert_eq!(ApiError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::TokenInvalid.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_expired_and_invalid_are_distinguishable() {
        assert_ne!(ApiError::TokenExpired.code(), ApiError::TokenInvalid.code());
    }

    #[test]
    fn test_unique_violation_mapping() {
        let db_err = sea_orm::DbErr::Custom(
            "error returned from database: UNIQUE constraint failed: users.username".into(),
        );
        assert!(matches!(map_unique_violation(db_err), ApiError::Conflict));

        let other = sea_orm::DbErr::Custom("disk I/O error".into());
        assert!(matches!(map_unique_violation(other), ApiError::Database(_)));
    }
}
