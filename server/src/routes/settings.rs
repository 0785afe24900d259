use axum::{extract::State, Extension, Json};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

use crate::entities::settings;
use crate::error::ApiError;
use crate::models::{validate_email, UpdateSettingsRequest};
use crate::policy::{require_admin, CurrentUser};
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
) -> Result<Json<settings::Model>, ApiError> {
    require_admin(&actor)?;

    let row = settings::Entity::find_by_id(1)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("settings"))?;

    Ok(Json(row))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<settings::Model>, ApiError> {
    require_admin(&actor)?;

    let row = settings::Entity::find_by_id(1)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("settings"))?;

    let mut active = row.into_active_model();

    if let Some(name) = req.system_name {
        let name = name.trim().to_string();
        if name.is_empty() || name.len() > 64 {
            return Err(ApiError::Validation(
                "system name must be 1-64 characters".into(),
            ));
        }
        active.system_name = Set(name);
    }
    if let Some(maintenance) = req.maintenance_mode {
        active.maintenance_mode = Set(maintenance);
    }
    if let Some(allow) = req.allow_new_users {
        active.allow_new_users = Set(allow);
    }
    if let Some(email) = req.contact_email {
        let email = email.trim().to_string();
        validate_email(&email)?;
        active.contact_email = Set(email);
    }

    let updated = active.update(&state.db).await?;

    tracing::info!(by = %actor.username, "system settings updated");

    Ok(Json(updated))
}
