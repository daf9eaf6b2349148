use std::collections::BTreeMap;

use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::{Comment, SectionLike};
use crate::error::AppError;

/// Comments and per-recipe section likes. Neither references the recipes
/// table, so deleting a recipe leaves its engagement behind.
pub struct EngagementRepository;

impl EngagementRepository {
    /// Append a comment. Blank text is dropped and yields `None`.
    pub async fn add_comment(
        pool: &Pool<Sqlite>,
        recipe_id: i64,
        username: &str,
        text: &str,
    ) -> Result<Option<Comment>, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        Self::insert_comment(pool, recipe_id, username, text, 0)
            .await
            .map(Some)
    }

    pub(crate) async fn insert_comment(
        pool: &Pool<Sqlite>,
        recipe_id: i64,
        username: &str,
        text: &str,
        likes: i64,
    ) -> Result<Comment, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        let comment = sqlx::query_as::<_, Comment>(
            r#"
INSERT INTO comments (id, recipe_id, username, text, likes, created_at)
VALUES (?, ?, ?, ?, ?, ?)
RETURNING id, recipe_id, username, text, likes, created_at
            "#,
        )
        .bind(&id)
        .bind(recipe_id)
        .bind(username)
        .bind(text)
        .bind(likes)
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    pub async fn comments_for(
        pool: &Pool<Sqlite>,
        recipe_id: i64,
    ) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
SELECT id, recipe_id, username, text, likes, created_at
FROM comments
WHERE recipe_id = ?
ORDER BY seq ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// How many comments `username` already left on a recipe with exactly `text`
    pub async fn count_matching(
        pool: &Pool<Sqlite>,
        recipe_id: i64,
        username: &str,
        text: &str,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE recipe_id = ? AND username = ? AND text = ?",
        )
        .bind(recipe_id)
        .bind(username)
        .bind(text)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn all_comments(pool: &Pool<Sqlite>) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT id, recipe_id, username, text, likes, created_at FROM comments ORDER BY seq ASC",
        )
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Bump one comment's likes by id. `None` when no such comment exists.
    pub async fn like_comment(
        pool: &Pool<Sqlite>,
        comment_id: &str,
    ) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
UPDATE comments
SET likes = CASE WHEN likes < 9223372036854775807 THEN likes + 1 ELSE likes END
WHERE id = ?
RETURNING id, recipe_id, username, text, likes, created_at
            "#,
        )
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Bump the recipe's section counter, starting it at zero if absent
    pub async fn like_section(pool: &Pool<Sqlite>, recipe_id: i64) -> Result<i64, AppError> {
        let like = sqlx::query_as::<_, SectionLike>(
            r#"
INSERT INTO section_likes (recipe_id, count) VALUES (?, 1)
ON CONFLICT(recipe_id) DO UPDATE SET
    count = CASE WHEN count < 9223372036854775807 THEN count + 1 ELSE count END
RETURNING recipe_id, count
            "#,
        )
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;

        Ok(like.count)
    }

    pub async fn section_likes(pool: &Pool<Sqlite>, recipe_id: i64) -> Result<i64, AppError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM section_likes WHERE recipe_id = ?")
                .bind(recipe_id)
                .fetch_optional(pool)
                .await?;

        Ok(count.unwrap_or(0))
    }

    pub async fn all_section_likes(pool: &Pool<Sqlite>) -> Result<BTreeMap<i64, i64>, AppError> {
        let likes = sqlx::query_as::<_, SectionLike>("SELECT recipe_id, count FROM section_likes")
            .fetch_all(pool)
            .await?;

        Ok(likes.into_iter().map(|l| (l.recipe_id, l.count)).collect())
    }

    /// Raise a counter to at least `count`; counters never go down
    pub async fn merge_section_likes(
        pool: &Pool<Sqlite>,
        recipe_id: i64,
        count: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
INSERT INTO section_likes (recipe_id, count) VALUES (?, ?)
ON CONFLICT(recipe_id) DO UPDATE SET count = MAX(count, excluded.count)
            "#,
        )
        .bind(recipe_id)
        .bind(count.max(0))
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_blank_comment_is_dropped() {
        let pool = db::in_memory().await.unwrap();
        let result = EngagementRepository::add_comment(&pool, 1, "alice", "   \n\t")
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(EngagementRepository::all_comments(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_text_is_trimmed() {
        let pool = db::in_memory().await.unwrap();
        let comment = EngagementRepository::add_comment(&pool, 1, "alice", "  tasty  ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(comment.text, "tasty");
        assert_eq!(comment.likes, 0);
    }

    #[tokio::test]
    async fn test_comments_for_filters_and_keeps_order() {
        let pool = db::in_memory().await.unwrap();
        for i in 0..10 {
            let recipe_id = if i % 2 == 0 { 1 } else { 2 };
            EngagementRepository::add_comment(&pool, recipe_id, "alice", &format!("c{}", i))
                .await
                .unwrap();
        }

        let texts: Vec<String> = EngagementRepository::comments_for(&pool, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["c0", "c2", "c4", "c6", "c8"]);

        let others = EngagementRepository::comments_for(&pool, 2).await.unwrap();
        assert!(others.iter().all(|c| c.recipe_id == 2));
        assert!(EngagementRepository::comments_for(&pool, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_comments_are_liked_independently() {
        let pool = db::in_memory().await.unwrap();
        let first = EngagementRepository::add_comment(&pool, 1, "alice", "same")
            .await
            .unwrap()
            .unwrap();
        let second = EngagementRepository::add_comment(&pool, 1, "alice", "same")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first.id, second.id);

        let liked = EngagementRepository::like_comment(&pool, &second.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(liked.likes, 1);

        let comments = EngagementRepository::comments_for(&pool, 1).await.unwrap();
        assert_eq!(comments[0].likes, 0);
        assert_eq!(comments[1].likes, 1);
    }

    #[tokio::test]
    async fn test_like_unknown_comment() {
        let pool = db::in_memory().await.unwrap();
        let result = EngagementRepository::like_comment(&pool, "nope").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_section_likes_count_per_recipe() {
        let pool = db::in_memory().await.unwrap();
        assert_eq!(EngagementRepository::section_likes(&pool, 7).await.unwrap(), 0);

        for n in 1..=5 {
            assert_eq!(EngagementRepository::like_section(&pool, 7).await.unwrap(), n);
        }
        EngagementRepository::like_section(&pool, 8).await.unwrap();

        assert_eq!(EngagementRepository::section_likes(&pool, 7).await.unwrap(), 5);
        assert_eq!(EngagementRepository::section_likes(&pool, 8).await.unwrap(), 1);

        let all = EngagementRepository::all_section_likes(&pool).await.unwrap();
        assert_eq!(all.get(&7), Some(&5));
        assert_eq!(all.get(&8), Some(&1));
    }

    #[tokio::test]
    async fn test_likes_saturate_instead_of_overflowing() {
        let pool = db::in_memory().await.unwrap();
        EngagementRepository::merge_section_likes(&pool, 1, i64::MAX).await.unwrap();
        assert_eq!(EngagementRepository::like_section(&pool, 1).await.unwrap(), i64::MAX);
        assert_eq!(
            EngagementRepository::all_section_likes(&pool).await.unwrap().get(&1),
            Some(&i64::MAX)
        );

        let comment = EngagementRepository::insert_comment(&pool, 1, "alice", "hi", i64::MAX)
            .await
            .unwrap();
        let liked = EngagementRepository::like_comment(&pool, &comment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(liked.likes, i64::MAX);
        assert_eq!(EngagementRepository::all_comments(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_matching_comments() {
        let pool = db::in_memory().await.unwrap();
        EngagementRepository::add_comment(&pool, 1, "alice", "hi").await.unwrap();
        EngagementRepository::add_comment(&pool, 1, "alice", "hi").await.unwrap();
        EngagementRepository::add_comment(&pool, 1, "bob", "hi").await.unwrap();
        EngagementRepository::add_comment(&pool, 2, "alice", "hi").await.unwrap();

        assert_eq!(EngagementRepository::count_matching(&pool, 1, "alice", "hi").await.unwrap(), 2);
        assert_eq!(EngagementRepository::count_matching(&pool, 1, "alice", "yo").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_merge_section_likes_never_lowers() {
        let pool = db::in_memory().await.unwrap();
        EngagementRepository::like_section(&pool, 1).await.unwrap();
        EngagementRepository::like_section(&pool, 1).await.unwrap();

        EngagementRepository::merge_section_likes(&pool, 1, 1).await.unwrap();
        assert_eq!(EngagementRepository::section_likes(&pool, 1).await.unwrap(), 2);

        EngagementRepository::merge_section_likes(&pool, 1, 9).await.unwrap();
        assert_eq!(EngagementRepository::section_likes(&pool, 1).await.unwrap(), 9);
    }
}
