use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::models::Session;
use crate::error::AppError;

/// Client contexts. A context keeps its username after logout; only the
/// logged-in flag is cleared.
pub struct SessionRepository;

impl SessionRepository {
    pub async fn login(pool: &Pool<Sqlite>, username: &str) -> Result<Session, AppError> {
        let token = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        let session = sqlx::query_as::<_, Session>(
            r#"
INSERT INTO sessions (token, username, logged_in, created_at, updated_at)
VALUES (?, ?, 1, ?, ?)
RETURNING *
            "#,
        )
        .bind(&token)
        .bind(username)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    pub async fn get_by_token(
        pool: &Pool<Sqlite>,
        token: &str,
    ) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

        Ok(session)
    }

    /// Clears the flag. Returns false when the token is unknown.
    pub async fn logout(pool: &Pool<Sqlite>, token: &str) -> Result<bool, AppError> {
        let now = chrono::Utc::now().timestamp();

        let result =
            sqlx::query("UPDATE sessions SET logged_in = 0, updated_at = ? WHERE token = ?")
                .bind(now)
                .bind(token)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop logged-out contexts that have been idle longer than `retention_hours`
    pub async fn purge_logged_out(
        pool: &Pool<Sqlite>,
        retention_hours: i64,
    ) -> Result<u64, AppError> {
        let cutoff = chrono::Utc::now().timestamp() - retention_hours * 3600;

        let result = sqlx::query("DELETE FROM sessions WHERE logged_in = 0 AND updated_at <= ?")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_login_sets_flag_and_username() {
        let pool = db::in_memory().await.unwrap();
        let session = SessionRepository::login(&pool, "alice").await.unwrap();
        assert!(session.logged_in);
        assert_eq!(session.username, "alice");

        let fetched = SessionRepository::get_by_token(&pool, &session.token)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.logged_in);
    }

    #[tokio::test]
    async fn test_logout_keeps_stale_username() {
        let pool = db::in_memory().await.unwrap();
        let session = SessionRepository::login(&pool, "alice").await.unwrap();

        assert!(SessionRepository::logout(&pool, &session.token).await.unwrap());

        let fetched = SessionRepository::get_by_token(&pool, &session.token)
            .await
            .unwrap()
            .unwrap();
        assert!(!fetched.logged_in);
        assert_eq!(fetched.username, "alice");
    }

    #[tokio::test]
    async fn test_logout_unknown_token() {
        let pool = db::in_memory().await.unwrap();
        assert!(!SessionRepository::logout(&pool, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_only_touches_logged_out_sessions() {
        let pool = db::in_memory().await.unwrap();
        let active = SessionRepository::login(&pool, "alice").await.unwrap();
        let gone = SessionRepository::login(&pool, "alice").await.unwrap();
        SessionRepository::logout(&pool, &gone.token).await.unwrap();

        // Zero retention purges everything logged out up to now
        let purged = SessionRepository::purge_logged_out(&pool, 0).await.unwrap();
        assert_eq!(purged, 1);

        assert!(SessionRepository::get_by_token(&pool, &active.token)
            .await
            .unwrap()
            .is_some());
        assert!(SessionRepository::get_by_token(&pool, &gone.token)
            .await
            .unwrap()
            .is_none());
    }
}
