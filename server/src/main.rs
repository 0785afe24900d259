mod db;
mod entities;
mod error;
mod models;
mod policy;
mod rate_limit;
mod routes;
mod state;
mod token;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use clap::Parser;
use sea_orm::{EntityTrait, PaginatorTrait, Set};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use entities::{settings, user};
use models::UserStatus;
use state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Database path
    #[arg(short, long, env = "DATABASE_PATH", default_value = "minibank.db")]
    db_path: String,

    /// JWT signing secret; the process refuses to start without one
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: String,

    /// Password for the bootstrap admin account (first run only);
    /// a random one is generated and printed when absent
    #[arg(long, env = "ADMIN_PASSWORD")]
    admin_password: Option<String>,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "http://localhost:5173")]
    allowed_origins: String,

    /// Directory avatar uploads are stored in
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    upload_dir: PathBuf,

    /// Directory the frontend bundle is served from
    #[arg(long, env = "STATIC_DIR", default_value = "./public")]
    static_dir: PathBuf,
}

/// How often the rate-limit map is wholesale reset.
const LIMITER_SWEEP: Duration = Duration::from_secs(rate_limit::SWEEP_INTERVAL_SECS);

/// Cadence of the store keep-alive probe.
const DB_KEEPALIVE: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let port = args.port;

    // Allowed origins are validated up front; a typo here should stop the
    // process, not silently break the browser.
    let origins: Vec<HeaderValue> = match args
        .allowed_origins
        .split(',')
        .map(|o| o.trim().parse::<HeaderValue>())
        .collect()
    {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("Invalid ALLOWED_ORIGINS value: {e}");
            std::process::exit(1);
        }
    };

    // Ensure uploads directory exists
    tokio::fs::create_dir_all(&args.upload_dir).await.ok();

    tracing::info!("Initializing database at {}", args.db_path);
    let db = db::init(&args.db_path).await;

    seed_settings(&db).await;
    bootstrap_admin(&db, args.admin_password.as_deref()).await;

    let state = AppState::new(db, args.jwt_secret, args.upload_dir.clone());

    // --- Background timers: fire-and-forget, failures logged, never fatal ---
    let sweeper = state.limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(LIMITER_SWEEP);
        tick.tick().await; // first tick completes immediately
        loop {
            tick.tick().await;
            sweeper.sweep();
            tracing::debug!("rate-limit counters reset");
        }
    });

    let keepalive = state.db.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(DB_KEEPALIVE);
        tick.tick().await;
        loop {
            tick.tick().await;
            if let Err(e) = keepalive.ping().await {
                tracing::warn!("database keep-alive failed: {e}");
            }
        }
    });

    let public = Router::new()
        // Liveness / readiness
        .route("/api/health", get(routes::health::health))
        .route("/api/health/db", get(routes::health::health_db))
        // Session lifecycle
        .route("/api/signup", post(routes::auth::signup))
        .route("/api/login", post(routes::auth::login))
        .route("/api/logout", post(routes::auth::logout));

    let protected = Router::new()
        .route("/api/me", get(routes::auth::me))
        .route("/api/session", get(routes::auth::session))
        // User administration
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(routes::users::get_user)
                .patch(routes::users::update_profile)
                .delete(routes::users::delete_user),
        )
        .route("/api/users/{id}/status", patch(routes::users::update_status))
        .route("/api/users/{id}/balance", patch(routes::users::update_balance))
        .route("/api/users/{id}/pin", patch(routes::users::set_pin))
        .route("/api/users/{id}/verify-pin", post(routes::users::verify_pin))
        .route(
            "/api/users/{id}/avatar",
            patch(routes::avatars::upload_avatar)
                .delete(routes::avatars::delete_avatar)
                // Leave headroom over the avatar ceiling so the handler's own
                // size check is the one that answers.
                .layer(axum::extract::DefaultBodyLimit::max(4 * 1024 * 1024)),
        )
        // Transaction records
        .route(
            "/api/transactions",
            get(routes::transactions::list_all).post(routes::transactions::create),
        )
        .route("/api/transactions/{id}", delete(routes::transactions::delete))
        .route(
            "/api/users/{id}/transactions",
            get(routes::transactions::list_for_user),
        )
        // System configuration
        .route(
            "/api/settings",
            get(routes::settings::get_settings).patch(routes::settings::update_settings),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let spa_index = args.static_dir.join("index.html");
    let app = public
        .merge(protected)
        // Avatars and the frontend bundle come straight off disk; unmatched
        // non-API paths fall through to the entry document (client routing).
        .nest_service("/uploads", ServeDir::new(&args.upload_dir))
        .fallback_service(
            ServeDir::new(&args.static_dir).not_found_service(ServeFile::new(spa_index)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'; img-src 'self' data:"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("MiniBank server listening on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

/// Make sure the single settings row exists so the signup gate and
/// maintenance flag always have something to read.
async fn seed_settings(db: &sea_orm::DatabaseConnection) {
    let existing = settings::Entity::find_by_id(1).one(db).await.ok().flatten();
    if existing.is_none() {
        let row = settings::ActiveModel {
            id: Set(1),
            system_name: Set("MiniBank".to_string()),
            maintenance_mode: Set(false),
            allow_new_users: Set(true),
            contact_email: Set("support@minibank.local".to_string()),
        };
        if let Err(e) = settings::Entity::insert(row).exec(db).await {
            tracing::error!("Failed to seed settings row: {e}");
        }
    }
}

/// First-run admin control: when the user table is empty, create the
/// administrator with the configured bootstrap password (or a generated one,
/// printed once).
async fn bootstrap_admin(db: &sea_orm::DatabaseConnection, admin_password: Option<&str>) {
    let user_count = user::Entity::find().count(db).await.unwrap_or(0);
    if user_count != 0 {
        return;
    }

    let (password, generated) = match admin_password {
        Some(p) => (p.to_string(), false),
        None => {
            use rand::Rng;
            let p: String = rand::thread_rng()
                .sample_iter(&rand::distributions::Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            (p, true)
        }
    };

    let password_hash = routes::auth::hash_secret(&password).expect("Failed to hash password");
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let admin = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        username: Set("admin".to_string()),
        email: Set("admin@minibank.local".to_string()),
        full_name: Set("Administrator".to_string()),
        password_hash: Set(password_hash),
        pin_hash: Set(None),
        avatar_url: Set(None),
        is_admin: Set(true),
        status: Set(UserStatus::Active.as_str().to_string()),
        balance: Set(0.0),
        created_at: Set(now),
        last_login_at: Set(None),
    };

    user::Entity::insert(admin)
        .exec(db)
        .await
        .expect("Failed to create admin user");

    if generated {
        println!();
        println!("  ╔══════════════════════════════════════════════╗");
        println!("  ║          FIRST-RUN ADMIN CREATED!            ║");
        println!("  ╠══════════════════════════════════════════════╣");
        println!("  ║  Username: {:<34}║", "admin");
        println!("  ║  Password: {:<34}║", password);
        println!("  ╠══════════════════════════════════════════════╣");
        println!("  ║  PLEASE SAVE THESE CREDENTIALS NOW!          ║");
        println!("  ╚══════════════════════════════════════════════╝");
        println!();
    } else {
        tracing::info!("First-run admin account created");
    }
}
