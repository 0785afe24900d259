use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::entities::{settings, user};
use crate::error::{map_unique_violation, ApiError};
use crate::models::{
    validate_email, validate_full_name, validate_password, validate_pin, validate_username,
    AuthResponse, LoginRequest, SessionResponse, SignupRequest, UserStatus,
};
use crate::policy::CurrentUser;
use crate::rate_limit::{client_addr, login_key};
use crate::state::AppState;
use crate::token;

// ─── Password / PIN hashing ───

pub fn hash_secret(secret: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("hash error: {e}")))
}

pub fn verify_secret(hash: &str, candidate: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("hash parse error: {e}")))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

// ─── Session cookie ───

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((token::COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(token::SESSION_TTL_HOURS))
        .build()
}

fn cleared_cookie() -> Cookie<'static> {
    Cookie::build((token::COOKIE_NAME, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

// ─── Auth middleware ───

/// Locate the credential (cookie first, bearer header as fallback), verify
/// it, and attach the resolved identity to the request. Missing credential
/// is 401; expired and invalid credentials are distinct 403s.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = jar
        .get(token::COOKIE_NAME)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(req.headers()));

    let credential = credential.ok_or(ApiError::Unauthorized)?;
    let claims = token::verify(&state.jwt_secret, &credential)?;

    req.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(req).await)
}

// ─── Routes ───

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    // Registration gate first: when signups are off the answer is 403 no
    // matter what the payload looks like.
    let allow_new_users = settings::Entity::find_by_id(1)
        .one(&state.db)
        .await?
        .map(|s| s.allow_new_users)
        .unwrap_or(true);
    if !allow_new_users {
        return Err(ApiError::RegistrationClosed);
    }

    let username = req.username.trim().to_lowercase();
    let email = req.email.trim().to_string();
    let full_name = req.full_name.trim().to_string();

    validate_full_name(&full_name)?;
    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&req.password)?;
    if let Some(pin) = &req.pin {
        validate_pin(pin)?;
    }

    let password_hash = hash_secret(&req.password)?;
    let pin_hash = req.pin.as_deref().map(hash_secret).transpose()?;

    let user_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let created = user::ActiveModel {
        id: Set(user_id.clone()),
        username: Set(username.clone()),
        email: Set(email),
        full_name: Set(full_name),
        password_hash: Set(password_hash),
        pin_hash: Set(pin_hash),
        avatar_url: Set(None),
        is_admin: Set(false),
        status: Set(UserStatus::Active.as_str().to_string()),
        balance: Set(0.0),
        created_at: Set(now),
        last_login_at: Set(None),
    }
    .insert(&state.db)
    .await
    .map_err(map_unique_violation)?;

    let credential = token::mint(&state.jwt_secret, &created.id, &created.username, false)?;
    tracing::info!(username = %created.username, "new user registered");

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(credential)),
        Json(AuthResponse { user: created }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let key = login_key(&client_addr(&headers, &addr));

    // Reject over-limit clients before the store is ever consulted.
    if !state.limiter.check(&key) {
        return Err(ApiError::RateLimited);
    }

    let username = req.username.trim().to_lowercase();

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?;

    let Some(account) = found else {
        state.limiter.record_failure(&key);
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_secret(&account.password_hash, &req.password)? {
        state.limiter.record_failure(&key);
        return Err(ApiError::InvalidCredentials);
    }

    if account.status == UserStatus::Inactive.as_str() {
        return Err(ApiError::Forbidden("this account has been deactivated".into()));
    }

    // Maintenance keeps everyone but admins out.
    let maintenance = settings::Entity::find_by_id(1)
        .one(&state.db)
        .await?
        .map(|s| s.maintenance_mode)
        .unwrap_or(false);
    if maintenance && !account.is_admin {
        return Err(ApiError::Maintenance);
    }

    state.limiter.record_success(&key);

    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    user::Entity::update_many()
        .col_expr(user::Column::LastLoginAt, Expr::value(Some(now.clone())))
        .filter(user::Column::Id.eq(&account.id))
        .exec(&state.db)
        .await?;

    let credential =
        token::mint(&state.jwt_secret, &account.id, &account.username, account.is_admin)?;

    let user = user::Model {
        last_login_at: Some(now),
        ..account
    };

    Ok((jar.add(session_cookie(credential)), Json(AuthResponse { user })))
}

/// Clears the cookie only; the credential itself stays valid until expiry
/// (stateless sessions, nothing to revoke server-side).
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(cleared_cookie()), StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
) -> Result<Json<user::Model>, ApiError> {
    let account = user::Entity::find_by_id(&actor.id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(account))
}

/// Lightweight echo of the verified claims, no store round-trip.
pub async fn session(
    Extension(actor): Extension<CurrentUser>,
) -> Json<SessionResponse> {
    let expires_at = chrono::DateTime::from_timestamp(actor.exp as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    Json(SessionResponse {
        id: actor.id,
        username: actor.username,
        is_admin: actor.is_admin,
        expires_at,
    })
}
