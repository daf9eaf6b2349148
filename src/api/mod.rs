pub mod auth;
pub mod feed;
pub mod middleware;
pub mod recipes;
pub mod state;
pub mod storage;
pub mod validation;

pub use middleware::RateLimiter;
pub use state::{AppState, CurrentUser};

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let body_limit = state.config.max_body_bytes;

    // Screens that need a logged-in context
    let protected = Router::new()
        .route("/api/dashboard", get(recipes::dashboard))
        .route("/api/recipes", post(recipes::create_recipe))
        .route("/api/recipes/:id", delete(recipes::delete_recipe))
        .route("/api/profile/:username", get(recipes::profile))
        .route("/api/feed", get(feed::feed))
        .route(
            "/api/recipes/:id/comments",
            get(feed::list_comments).post(feed::add_comment),
        )
        .route(
            "/api/recipes/:id/like",
            get(feed::section_likes).post(feed::like_section),
        )
        .route("/api/comments/:id/like", post(feed::like_comment))
        .route("/api/storage/export", get(storage::export))
        .route("/api/storage/import", post(storage::import))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/session", get(auth::session))
        .merge(protected)
        .layer(axum_middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_middleware(limiter, req, next)
        }))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
