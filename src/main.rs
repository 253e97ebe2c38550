//! Station Amenity Tracker Backend
//!
//! REST backend for tracking amenities, issues and inspections across railway
//! stations, with SQLite persistence, session auth and MIS reporting.

mod analysis;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod mail;
mod mis;
mod models;
mod uploads;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use analysis::PhotoAnalyzer;
use config::Config;
use db::Repository;
use mail::Mailer;

/// Multipart bodies carry one image plus form overhead.
const UPLOAD_BODY_LIMIT: usize = uploads::MAX_FILE_SIZE + 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub mailer: Arc<Mailer>,
    pub analyzer: Arc<PhotoAnalyzer>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Station Amenity Tracker Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.smtp.is_none() {
        tracing::warn!("No SMTP host configured (AMENITY_SMTP_HOST). Alert mails are disabled");
    }
    if config.ai.api_key.is_none() {
        tracing::warn!("No AI API key configured (AMENITY_AI_API_KEY). Photo analysis is disabled");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => repo.ensure_admin(email, password).await?,
        _ => tracing::info!("No bootstrap administrator configured"),
    }

    let purged = repo.purge_expired_sessions().await?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    std::fs::create_dir_all(&config.upload_dir)?;

    // Create application state
    let state = AppState {
        repo,
        mailer: Arc::new(Mailer::new(config.smtp.as_ref())?),
        analyzer: Arc::new(PhotoAnalyzer::new(config.ai.clone())?),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Auth
        .route("/auth/login", post(api::login))
        .route("/auth/logout", post(api::logout))
        .route("/auth/me", get(api::me))
        .route("/auth/register", post(api::register))
        // Stations
        .route("/stations", get(api::list_stations).post(api::create_station))
        .route(
            "/stations/{id}",
            get(api::get_station)
                .put(api::update_station)
                .delete(api::delete_station),
        )
        // Users
        .route("/users", get(api::list_users).post(api::create_user))
        .route(
            "/users/{id}",
            get(api::get_user)
                .put(api::update_user)
                .delete(api::delete_user),
        )
        // Amenity types
        .route(
            "/amenity-types",
            get(api::list_amenity_types).post(api::create_amenity_type),
        )
        // Amenities
        .route("/amenities", get(api::list_amenities).post(api::create_amenity))
        .route(
            "/amenities/{id}",
            get(api::get_amenity)
                .put(api::update_amenity)
                .delete(api::delete_amenity),
        )
        // Issues
        .route("/issues", get(api::list_issues).post(api::create_issue))
        .route(
            "/issues/{id}",
            get(api::get_issue)
                .put(api::update_issue)
                .delete(api::delete_issue),
        )
        .route("/issues/{id}/status", patch(api::update_issue_status))
        .route("/issues/{id}/assign", patch(api::assign_issue))
        // Inspections
        .route(
            "/inspections",
            get(api::list_inspections).post(api::create_inspection),
        )
        .route("/inspections/{id}", get(api::get_inspection))
        // Reports
        .route("/reports", get(api::list_reports).post(api::create_report))
        .route("/reports/mis", get(api::get_mis))
        .route("/reports/{id}", get(api::get_report))
        // Config
        .route("/config", get(api::get_config).put(api::update_config))
        // Uploads and analysis
        .route(
            "/uploads",
            post(api::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/analysis/photo",
            post(api::analyze_photo).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Resolve the session cookie or bearer token into a CurrentUser
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .nest_service(
            uploads::PUBLIC_PREFIX,
            ServeDir::new(&state.config.upload_dir),
        )
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
