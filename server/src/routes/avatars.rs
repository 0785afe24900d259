use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::path::PathBuf;

use crate::entities::user;
use crate::error::ApiError;
use crate::policy::{require_self_or_admin, CurrentUser};
use crate::state::AppState;

const MAX_AVATAR_SIZE: usize = 2 * 1024 * 1024; // 2MB

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

fn get_extension(mime: &str) -> &str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "bin",
    }
}

/// Resolve a stored avatar URL ("/uploads/<file>") back to its on-disk path.
pub fn disk_path(state: &AppState, avatar_url: Option<&str>) -> Option<PathBuf> {
    let name = avatar_url?.strip_prefix("/uploads/")?;
    // Uploaded names are uuid-derived; anything with a separator is not ours.
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return None;
    }
    Some(state.upload_dir.join(name))
}

/// Upload user avatar (PNG or JPEG, 2MB max). The file lands on disk under a
/// per-user-derived name and the public URL is recorded on the user row.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_self_or_admin(&actor, &id)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("multipart error: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "avatar" && field_name != "file" {
            continue;
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::Validation(
                "avatar must be PNG or JPEG".into(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("read error: {e}")))?;

        if data.len() > MAX_AVATAR_SIZE {
            return Err(ApiError::Validation("avatar too large (max 2MB)".into()));
        }

        // Replacing an avatar of the other format would orphan the old file.
        if let Some(old) = disk_path(&state, account.avatar_url.as_deref()) {
            tokio::fs::remove_file(old).await.ok();
        }

        let ext = get_extension(&content_type);
        let disk_filename = format!("{id}.{ext}");

        tokio::fs::write(state.upload_dir.join(&disk_filename), &data)
            .await
            .map_err(|e| ApiError::Internal(format!("write error: {e}")))?;

        let avatar_url = format!("/uploads/{disk_filename}");

        user::Entity::update_many()
            .col_expr(user::Column::AvatarUrl, Expr::value(Some(avatar_url.clone())))
            .filter(user::Column::Id.eq(&id))
            .exec(&state.db)
            .await?;

        return Ok(Json(serde_json::json!({ "avatar_url": avatar_url })));
    }

    Err(ApiError::Validation("no file found".into()))
}

/// Clear the avatar reference and remove the stored file (best effort).
pub async fn delete_avatar(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_self_or_admin(&actor, &id)?;

    let account = user::Entity::find_by_id(&id)
        .one(&state.db)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if let Some(path) = disk_path(&state, account.avatar_url.as_deref()) {
        tokio::fs::remove_file(path).await.ok();
    }

    user::Entity::update_many()
        .col_expr(user::Column::AvatarUrl, Expr::value(Option::<String>::None))
        .filter(user::Column::Id.eq(&id))
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(get_extension("image/png"), "png");
        assert_eq!(get_extension("image/jpeg"), "jpg");
        assert_eq!(get_extension("image/gif"), "bin");
    }
}
