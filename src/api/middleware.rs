use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::api::state::{AppState, CurrentUser};
use crate::db::SessionRepository;
use crate::error::AppError;

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid Authorization format".to_string()))
}

/// Session gate for protected screens. A context that has logged out is
/// turned away even though it still remembers its username.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?.to_string();

    let session = SessionRepository::get_by_token(&state.db, &token)
        .await?
        .filter(|s| s.logged_in)
        .ok_or_else(|| AppError::Auth("Not logged in".to_string()))?;

    request.extensions_mut().insert(CurrentUser {
        username: session.username,
    });

    Ok(next.run(request).await)
}

/// Requests seen from one address in the current window
#[derive(Debug, Clone, Copy)]
struct Window {
    hits: u32,
    opened: Instant,
}

/// Fixed-window request counter keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
    span: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
            span: Duration::from_secs(window_secs),
        }
    }

    /// Count one request from `ip`. On refusal, returns how long until the
    /// address's window reopens.
    pub async fn admit(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(ip).or_insert(Window { hits: 0, opened: now });

        let age = now.duration_since(window.opened);
        if age > self.span {
            *window = Window { hits: 1, opened: now };
            return Ok(());
        }

        if window.hits >= self.limit {
            return Err(self.span - age);
        }
        window.hits += 1;
        Ok(())
    }

    /// Forget addresses whose window closed more than one span ago
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let horizon = self.span * 2;
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.opened) <= horizon);
    }
}

pub async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Without connect info (tests, unix sockets) everyone shares loopback
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    if let Err(retry_after) = limiter.admit(ip).await {
        tracing::warn!(
            %ip,
            limit = limiter.limit,
            window_secs = limiter.span.as_secs(),
            retry_after_secs = retry_after.as_secs(),
            "rate limit exceeded"
        );
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}
