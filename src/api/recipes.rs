use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::api::state::{AppState, CurrentUser};
use crate::api::validation::RecipeForm;
use crate::db::{NewRecipe, Recipe, RecipeRepository};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub username: String,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: bool,
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, AppError> {
    let recipes = RecipeRepository::list_for_user(&state.db, &user.username).await?;

    Ok(Json(DashboardResponse {
        username: user.username,
        recipes,
    }))
}

/// POST /api/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(form): Json<RecipeForm>,
) -> Result<Json<Recipe>, AppError> {
    let recipe = NewRecipe::try_from(form)?;
    let created = RecipeRepository::create(&state.db, &user.username, &recipe).await?;

    Ok(Json(created))
}

/// DELETE /api/recipes/:id
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = RecipeRepository::delete(&state.db, &user.username, id).await?;
    if !deleted {
        tracing::debug!(recipe_id = id, username = %user.username, "nothing to delete");
    }

    Ok(Json(DeleteResponse {
        success: true,
        deleted,
    }))
}

/// GET /api/profile/:username
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let recipes = RecipeRepository::list_for_user(&state.db, &username).await?;

    Ok(Json(ProfileResponse { username, recipes }))
}
