use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::models::HealthResponse;
use crate::state::AppState;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        database: None,
    })
}

/// Readiness: pings the store; degraded state is a 503 so load balancers can
/// take the instance out of rotation.
pub async fn health_db(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: Some("ok"),
            }),
        ),
        Err(e) => {
            tracing::warn!("database ping failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: Some("unreachable"),
                }),
            )
        }
    }
}
