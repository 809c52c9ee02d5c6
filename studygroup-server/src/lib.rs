pub mod auth;
pub mod config;
pub mod course;
pub mod dto;
pub mod error;
pub mod interpreter;
pub mod repository;
pub mod student;
pub mod study_group;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{Config, MAX_SESSION_TTL_DAYS};
use crate::repository::SqliteRepository;

pub fn get_server_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct AppState {
    pub repository: SqliteRepository,
    pub session_ttl: chrono::Duration,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(repository: SqliteRepository, config: &Config) -> Self {
        Self {
            repository,
            session_ttl: chrono::Duration::days(
                config.session_ttl_days.clamp(1, MAX_SESSION_TTL_DAYS),
            ),
            cookie_secure: config.cookie_secure,
        }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "studygroup-server",
        "version": get_server_version(),
    }))
}

/// The full HTTP application.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(auth::router())
        .merge(student::router())
        .merge(study_group::router())
        .merge(course::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
