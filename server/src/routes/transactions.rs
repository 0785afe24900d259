use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::entities::{transaction, user};
use crate::error::ApiError;
use crate::models::{CreateTransactionRequest, TransactionsQuery, TxType};
use crate::policy::{require_admin, require_self_or_admin, CurrentUser};
use crate::state::AppState;

/// Record a transaction. Everyone records against their own account; admins
/// may record against any user. The owner's balance is not touched; balance
/// changes only through the explicit balance operation.
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<transaction::Model>), ApiError> {
    let owner_id = req.user_id.clone().unwrap_or_else(|| actor.id.clone());
    if owner_id != actor.id {
        require_admin(&actor)?;
    }

    let tx_type = TxType::parse(req.tx_type.trim())?;
    if !(req.amount > 0.0) || !req.amount.is_finite() {
        return Err(ApiError::Validation("amount must be positive".into()));
    }

    user::Entity::find_by_id(&owner_id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let created = transaction::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(owner_id),
        tx_type: Set(tx_type.as_str().to_string()),
        amount: Set(req.amount),
        memo: Set(req.memo.clone()),
        recipient: Set(req.recipient.clone()),
        created_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<transaction::Model>>, ApiError> {
    require_admin(&actor)?;
    let limit = query.limit.unwrap_or(100).min(500) as u64;

    let records = transaction::Entity::find()
        .order_by_desc(transaction::Column::CreatedAt)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(records))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<transaction::Model>>, ApiError> {
    require_self_or_admin(&actor, &id)?;

    user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let limit = query.limit.unwrap_or(100).min(500) as u64;

    let records = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(&id))
        .order_by_desc(transaction::Column::CreatedAt)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(records))
}

/// Administrative deletion; records are otherwise immutable.
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&actor)?;

    let result = transaction::Entity::delete_by_id(&id)
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("transaction"));
    }

    Ok(StatusCode::NO_CONTENT)
}
