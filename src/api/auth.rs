use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::bearer_token;
use crate::api::state::AppState;
use crate::api::validation::credentials_present;
use crate::crypto::Credential;
use crate::db::{CredentialRepository, SessionRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

/// Login reply; failures are reported in-band with `success: false`
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl LoginResponse {
    fn failure(message: &str) -> Self {
        LoginResponse {
            success: false,
            username: None,
            message: Some(message.to_string()),
            session_token: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub logged_in: bool,
    pub username: String,
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let (username, password) = credentials_present(&req.username, &req.password)
        .ok_or_else(|| AppError::Validation("Please fill in all fields.".to_string()))?;

    let credential = Credential::derive(&password)?;
    let record = CredentialRepository::register(&state.db, &username, &credential).await?;
    tracing::info!(username = %record.username, "user registered");

    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration successful! You can now log in.".to_string(),
    }))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let Some((username, password)) = credentials_present(&req.username, &req.password) else {
        return Ok(Json(LoginResponse::failure(
            "Please enter both username and password.",
        )));
    };

    let Some(canonical) =
        CredentialRepository::authenticate(&state.db, &username, &password).await?
    else {
        tracing::debug!(%username, "login rejected");
        return Ok(Json(LoginResponse::failure("Invalid username or password")));
    };

    let session = SessionRepository::login(&state.db, &canonical).await?;
    tracing::info!(username = %canonical, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        username: Some(canonical),
        message: None,
        session_token: Some(session.token),
    }))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers)?;

    if !SessionRepository::logout(&state.db, token).await? {
        return Err(AppError::Auth("Unknown session".to_string()));
    }

    Ok(Json(serde_json::json!({"success": true})))
}

/// GET /api/session
///
/// Reports the context even after logout, username included.
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = bearer_token(&headers)?;

    let session = SessionRepository::get_by_token(&state.db, token)
        .await?
        .ok_or_else(|| AppError::Auth("Unknown session".to_string()))?;

    Ok(Json(SessionResponse {
        logged_in: session.logged_in,
        username: session.username,
    }))
}
