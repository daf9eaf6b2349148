use sqlx::{Pool, Sqlite};

use crate::db::models::{NewRecipe, Recipe};
use crate::db::now_millis;
use crate::error::AppError;

/// One table backs both the owner view and the global feed, so the two
/// can never disagree.
pub struct RecipeRepository;

impl RecipeRepository {
    /// Store a recipe. The id is the creation time in milliseconds, bumped
    /// past the newest existing id when two posts land in the same tick.
    pub async fn create(
        pool: &Pool<Sqlite>,
        owner: &str,
        recipe: &NewRecipe,
    ) -> Result<Recipe, AppError> {
        let now = now_millis();

        let created = sqlx::query_as::<_, Recipe>(
            r#"
INSERT INTO recipes (id, title, protein, ingredients, instructions, image, username, created_at)
SELECT MAX(?, COALESCE(MAX(id), 0) + 1), ?, ?, ?, ?, ?, ?, ?
FROM recipes
RETURNING *
            "#,
        )
        .bind(now)
        .bind(&recipe.title)
        .bind(recipe.protein)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .bind(&recipe.image)
        .bind(owner)
        .bind(now / 1000)
        .fetch_one(pool)
        .await?;

        tracing::debug!(recipe_id = created.id, owner, "recipe created");
        Ok(created)
    }

    /// Insert a recipe that already carries an id. Returns false when the id is taken.
    pub async fn insert_existing(pool: &Pool<Sqlite>, recipe: &Recipe) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
INSERT OR IGNORE INTO recipes (id, title, protein, ingredients, instructions, image, username, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(recipe.protein)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .bind(&recipe.image)
        .bind(&recipe.username)
        .bind(recipe.created_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Recipe>, AppError> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(recipe)
    }

    pub async fn list_for_user(
        pool: &Pool<Sqlite>,
        username: &str,
    ) -> Result<Vec<Recipe>, AppError> {
        let recipes =
            sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE username = ? ORDER BY id ASC")
                .bind(username)
                .fetch_all(pool)
                .await?;

        Ok(recipes)
    }

    pub async fn list_all(pool: &Pool<Sqlite>) -> Result<Vec<Recipe>, AppError> {
        let recipes = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes ORDER BY id ASC")
            .fetch_all(pool)
            .await?;

        Ok(recipes)
    }

    /// Delete one of `owner`'s recipes. Another user's id is left alone.
    pub async fn delete(pool: &Pool<Sqlite>, owner: &str, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ? AND username = ?")
            .bind(id)
            .bind(owner)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
