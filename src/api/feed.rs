use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::state::{AppState, CurrentUser};
use crate::db::{Comment, EngagementRepository, Recipe, RecipeRepository};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct FeedEntry {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub comments: Vec<Comment>,
    pub section_likes: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AddCommentResponse {
    pub comment: Option<Comment>,
}

#[derive(Debug, Serialize)]
pub struct SectionLikeResponse {
    pub recipe_id: i64,
    pub likes: i64,
}

/// Attach each recipe's comments and section likes, keeping feed order
pub fn assemble_feed(
    recipes: Vec<Recipe>,
    comments: Vec<Comment>,
    section_likes: &std::collections::BTreeMap<i64, i64>,
) -> Vec<FeedEntry> {
    let mut by_recipe: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        by_recipe.entry(comment.recipe_id).or_default().push(comment);
    }

    recipes
        .into_iter()
        .map(|recipe| FeedEntry {
            comments: by_recipe.remove(&recipe.id).unwrap_or_default(),
            section_likes: section_likes.get(&recipe.id).copied().unwrap_or(0),
            recipe,
        })
        .collect()
}

/// GET /api/feed
pub async fn feed(State(state): State<AppState>) -> Result<Json<Vec<FeedEntry>>, AppError> {
    let recipes = RecipeRepository::list_all(&state.db).await?;
    let comments = EngagementRepository::all_comments(&state.db).await?;
    let section_likes = EngagementRepository::all_section_likes(&state.db).await?;

    Ok(Json(assemble_feed(recipes, comments, &section_likes)))
}

/// GET /api/recipes/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = EngagementRepository::comments_for(&state.db, recipe_id).await?;
    Ok(Json(comments))
}

/// POST /api/recipes/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(recipe_id): Path<i64>,
    Json(req): Json<AddCommentRequest>,
) -> Result<Json<AddCommentResponse>, AppError> {
    let comment =
        EngagementRepository::add_comment(&state.db, recipe_id, &user.username, &req.text).await?;

    Ok(Json(AddCommentResponse { comment }))
}

/// GET /api/recipes/:id/like
pub async fn section_likes(
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<SectionLikeResponse>, AppError> {
    let likes = EngagementRepository::section_likes(&state.db, recipe_id).await?;
    Ok(Json(SectionLikeResponse { recipe_id, likes }))
}

/// POST /api/recipes/:id/like
pub async fn like_section(
    State(state): State<AppState>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<SectionLikeResponse>, AppError> {
    let likes = EngagementRepository::like_section(&state.db, recipe_id).await?;
    Ok(Json(SectionLikeResponse { recipe_id, likes }))
}

/// POST /api/comments/:id/like
pub async fn like_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<Json<Comment>, AppError> {
    let comment = EngagementRepository::like_comment(&state.db, &comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;

    Ok(Json(comment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn recipe(id: i64) -> Recipe {
        Recipe {
            id,
            title: format!("r{}", id),
            protein: 10.0,
            ingredients: String::new(),
            instructions: String::new(),
            image: None,
            username: "alice".to_string(),
            created_at: 0,
        }
    }

    fn comment(recipe_id: i64, text: &str) -> Comment {
        Comment {
            id: text.to_string(),
            recipe_id,
            username: "bob".to_string(),
            text: text.to_string(),
            likes: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_assemble_feed_groups_by_recipe() {
        let mut likes = BTreeMap::new();
        likes.insert(2, 4);

        let feed = assemble_feed(
            vec![recipe(1), recipe(2)],
            vec![comment(2, "a"), comment(1, "b"), comment(2, "c"), comment(9, "orphan")],
            &likes,
        );

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].recipe.id, 1);
        assert_eq!(feed[0].section_likes, 0);
        assert_eq!(feed[0].comments.len(), 1);

        let texts: Vec<&str> = feed[1].comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
        assert_eq!(feed[1].section_likes, 4);
    }
}
