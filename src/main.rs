use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protein_recipes::{
    api::{create_router, AppState, RateLimiter},
    config::Config,
    db::{self, SessionRepository},
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,protein_recipes=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting protein-recipes server v{}", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env()?);
    tracing::info!("Configuration loaded");

    let pool = db::connect(&config).await?;
    tracing::info!("Database connected: {}", config.database_url);

    db::migrate(&pool).await?;
    tracing::info!("Database migrations completed");

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute, 60));
    tracing::info!(
        "Rate limiter configured ({} req/min per IP)",
        config.rate_limit_per_minute
    );

    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
    };

    // Logged-out contexts only keep a stale username; purge them after retention
    {
        let pool = pool.clone();
        let retention = config.session_retention_hours;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match SessionRepository::purge_logged_out(&pool, retention).await {
                    Ok(n) => tracing::debug!("Purged {} logged-out sessions", n),
                    Err(e) => tracing::error!("Session purge failed: {}", e),
                }
            }
        });
    }

    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
                tracing::debug!("Rate limiter cache cleaned up");
            }
        });
    }

    let app = create_router(state, rate_limiter);

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("  POST /api/register | POST /api/login | POST /api/logout | GET /api/session");
    tracing::info!("  GET  /api/dashboard | POST /api/recipes | DELETE /api/recipes/:id");
    tracing::info!("  GET  /api/feed | GET /api/profile/:username");
    tracing::info!("  GET|POST /api/recipes/:id/comments | POST /api/recipes/:id/like");
    tracing::info!("  POST /api/comments/:id/like");
    tracing::info!("  GET  /api/storage/export | POST /api/storage/import");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
