use std::path::PathBuf;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::rate_limit::RateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Failed-attempt limiter for the credential endpoints (login, PIN)
    pub limiter: Arc<RateLimiter>,
    /// Directory avatars are written to; served under /uploads
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(db: DatabaseConnection, jwt_secret: String, upload_dir: PathBuf) -> Self {
        Self {
            db,
            jwt_secret,
            limiter: Arc::new(RateLimiter::new()),
            upload_dir,
        }
    }
}
