use axum::{extract::State, Extension, Json};

use crate::api::state::{AppState, CurrentUser};
use crate::error::AppError;
use crate::snapshot::{self, ImportReport, Snapshot};

/// GET /api/storage/export
pub async fn export(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Snapshot>, AppError> {
    let snapshot = snapshot::export(&state.db, &user.username).await?;
    Ok(Json(snapshot))
}

/// POST /api/storage/import
///
/// Body is a browser storage dump: every value a JSON-encoded string.
pub async fn import(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(dump): Json<Snapshot>,
) -> Result<Json<ImportReport>, AppError> {
    let report = snapshot::import(&state.db, &dump, &user.username).await?;
    Ok(Json(report))
}
