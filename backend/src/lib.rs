//! # Check-In Backend
//!
//! Serves the contracts the check-in workflow consumes: identity lookup,
//! check-in (with registration of unknown people), today's attendance and the
//! ministry list.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers)
//!     ↓
//! Domain Layer (AttendanceService, MinistryService)
//!     ↓
//! Storage Layer (SQLite via sqlx)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::BackendConfig;
use crate::domain::{AttendanceService, MinistryService};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub attendance_service: AttendanceService,
    pub ministry_service: MinistryService,
}

impl AppState {
    pub fn from_db(db: Arc<DbConnection>) -> Self {
        Self {
            attendance_service: AttendanceService::from_db(db.clone()),
            ministry_service: MinistryService::new(db),
        }
    }
}

/// Open the database, build the services and seed configured ministries
pub async fn initialize_backend(config: &BackendConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = Arc::new(DbConnection::new(&config.database_url).await?);

    info!("Setting up application state");
    let app_state = AppState::from_db(db);

    if !config.seed_ministries.is_empty() {
        let created = app_state
            .ministry_service
            .ensure_ministries(&config.seed_ministries)
            .await?;
        info!("Seeded {} ministries", created);
    }

    Ok(app_state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, config: &BackendConfig) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(config.allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/attendance/lookup", get(io::lookup_user))
        .route("/attendance/check-in", post(io::check_in))
        .route("/attendance/today", get(io::get_today_attendance))
        .route("/ministries", get(io::list_ministries));

    Ok(Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
