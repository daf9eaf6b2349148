use sqlx::{Pool, Sqlite};

use crate::crypto::Credential;
use crate::db::models::CredentialRecord;
use crate::error::AppError;

/// Holds the one registered user. Registering again replaces the record.
pub struct CredentialRepository;

impl CredentialRepository {
    pub async fn register(
        pool: &Pool<Sqlite>,
        username: &str,
        credential: &Credential,
    ) -> Result<CredentialRecord, AppError> {
        let created_at = chrono::Utc::now().timestamp();

        let record = sqlx::query_as::<_, CredentialRecord>(
            r#"
INSERT INTO credentials (slot, username, password_hash, password_salt, created_at)
VALUES (1, ?, ?, ?, ?)
ON CONFLICT(slot) DO UPDATE SET
    username = excluded.username,
    password_hash = excluded.password_hash,
    password_salt = excluded.password_salt,
    created_at = excluded.created_at
RETURNING username, password_hash, password_salt, created_at
            "#,
        )
        .bind(username)
        .bind(credential.hash.as_slice())
        .bind(credential.salt.as_slice())
        .bind(created_at)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    pub async fn get(pool: &Pool<Sqlite>) -> Result<Option<CredentialRecord>, AppError> {
        let record = sqlx::query_as::<_, CredentialRecord>(
            "SELECT username, password_hash, password_salt, created_at FROM credentials WHERE slot = 1",
        )
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Returns the canonical stored username when both fields match
    pub async fn authenticate(
        pool: &Pool<Sqlite>,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, AppError> {
        let Some(record) = Self::get(pool).await? else {
            return Ok(None);
        };

        if record.username != username {
            return Ok(None);
        }

        let credential = Credential::from_stored(&record.password_hash, &record.password_salt)?;
        if credential.matches(password)? {
            Ok(Some(record.username))
        } else {
            Ok(None)
        }
    }
}
