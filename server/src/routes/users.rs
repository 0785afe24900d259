use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::entities::{transaction, user};
use crate::error::{map_unique_violation, ApiError};
use crate::models::{
    validate_email, validate_full_name, validate_password, validate_pin, validate_username,
    CreateUserRequest, SetPinRequest, UpdateBalanceRequest, UpdateProfileRequest,
    UpdateStatusRequest, UserStatus, VerifyPinRequest, VerifyPinResponse,
};
use crate::policy::{require_admin, require_self_or_admin, CurrentUser};
use crate::rate_limit::{client_addr, pin_key};
use crate::routes::auth::{hash_secret, verify_secret};
use crate::routes::avatars;
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
) -> Result<Json<Vec<user::Model>>, ApiError> {
    require_admin(&actor)?;

    let users = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<user::Model>, ApiError> {
    require_self_or_admin(&actor, &id)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(account))
}

/// Admin-create skips the registration gate and may set the admin flag and
/// an opening balance.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<user::Model>), ApiError> {
    require_admin(&actor)?;

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
    let balance = req.balance.unwrap_or(0.0);
    if balance < 0.0 {
        return Err(ApiError::Validation("balance cannot be negative".into()));
    }

    let password_hash = hash_secret(&req.password)?;
    let pin_hash = req.pin.as_deref().map(hash_secret).transpose()?;
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let created = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(username),
        email: Set(email),
        full_name: Set(full_name),
        password_hash: Set(password_hash),
        pin_hash: Set(pin_hash),
        avatar_url: Set(None),
        is_admin: Set(req.is_admin.unwrap_or(false)),
        status: Set(UserStatus::Active.as_str().to_string()),
        balance: Set(balance),
        created_at: Set(now),
        last_login_at: Set(None),
    }
    .insert(&state.db)
    .await
    .map_err(map_unique_violation)?;

    tracing::info!(username = %created.username, by = %actor.username, "user created");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<user::Model>, ApiError> {
    require_self_or_admin(&actor, &id)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let mut active = account.into_active_model();

    if let Some(full_name) = req.full_name {
        let full_name = full_name.trim().to_string();
        validate_full_name(&full_name)?;
        active.full_name = Set(full_name);
    }
    if let Some(email) = req.email {
        let email = email.trim().to_string();
        validate_email(&email)?;
        active.email = Set(email);
    }

    let updated = active.update(&state.db).await.map_err(map_unique_violation)?;

    Ok(Json(updated))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&actor)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    // Records first, then the stored avatar (best effort), then the row.
    transaction::Entity::delete_many()
        .filter(transaction::Column::UserId.eq(&id))
        .exec(&state.db)
        .await?;

    if let Some(path) = avatars::disk_path(&state, account.avatar_url.as_deref()) {
        tokio::fs::remove_file(path).await.ok();
    }

    user::Entity::delete_by_id(&id).exec(&state.db).await?;

    tracing::info!(user_id = %id, by = %actor.username, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<user::Model>, ApiError> {
    require_admin(&actor)?;

    let status = UserStatus::parse(&req.status)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    user::Entity::update_many()
        .col_expr(user::Column::Status, Expr::value(status.as_str()))
        .filter(user::Column::Id.eq(&id))
        .exec(&state.db)
        .await?;

    Ok(Json(user::Model {
        status: status.as_str().to_string(),
        ..account
    }))
}

pub async fn update_balance(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBalanceRequest>,
) -> Result<Json<user::Model>, ApiError> {
    // A negative balance is invalid regardless of who asks, so this check
    // runs before the role check.
    if req.balance < 0.0 || !req.balance.is_finite() {
        return Err(ApiError::Validation("balance cannot be negative".into()));
    }

    require_admin(&actor)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    user::Entity::update_many()
        .col_expr(user::Column::Balance, Expr::value(req.balance))
        .filter(user::Column::Id.eq(&id))
        .exec(&state.db)
        .await?;

    Ok(Json(user::Model {
        balance: req.balance,
        ..account
    }))
}

pub async fn set_pin(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<SetPinRequest>,
) -> Result<StatusCode, ApiError> {
    require_self_or_admin(&actor, &id)?;
    validate_pin(&req.pin)?;

    user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let pin_hash = hash_secret(&req.pin)?;
    user::Entity::update_many()
        .col_expr(user::Column::PinHash, Expr::value(Some(pin_hash)))
        .filter(user::Column::Id.eq(&id))
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Slow-hash compare of a candidate PIN. Goes through the same per-address
/// limiter as login so the 4-6 digit space cannot be walked.
pub async fn verify_pin(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<VerifyPinRequest>,
) -> Result<Json<VerifyPinResponse>, ApiError> {
    require_self_or_admin(&actor, &id)?;

    let key = pin_key(&client_addr(&headers, &addr));
    if !state.limiter.check(&key) {
        return Err(ApiError::RateLimited);
    }

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let valid = match &account.pin_hash {
        Some(hash) => verify_secret(hash, &req.pin)?,
        None => false,
    };

    if valid {
        state.limiter.record_success(&key);
    } else {
        state.limiter.record_failure(&key);
    }

    Ok(Json(VerifyPinResponse { valid }))
}
